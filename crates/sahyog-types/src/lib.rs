pub mod api;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod token;
