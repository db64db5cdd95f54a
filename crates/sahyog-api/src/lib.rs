pub mod analytics;
pub mod auth;
pub mod donations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod ngos;
pub mod policy;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
