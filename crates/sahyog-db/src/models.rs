use chrono::{DateTime, Utc};
use sahyog_types::models::{Role, User};

/// A `users` row including the password hash. Only auth code sees this type;
/// everything else gets the public [`User`].
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
        }
    }
}
