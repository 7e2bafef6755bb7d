//! Shop customers.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::constraints::{self, SchemaViolation, max_length, require};

/// A `users` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed by the backend on every write to the row.
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub const TABLE: &'static str = "users";
}

/// Column values for a user signup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            phone: phone.into(),
            password: password.into(),
        }
    }

    /// Checks the required-field and length rules of the `users` table.
    ///
    /// Uniqueness of `username` needs the other rows and is left to the
    /// backend.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let t = User::TABLE;
        require(constraints::USERNAME_REQUIRED, t, "username", &self.username)?;
        max_length(constraints::USERNAME_LENGTH, t, "username", &self.username, 15)?;
        require(constraints::EMAIL_REQUIRED, t, "email_address", &self.email)?;
        max_length(constraints::EMAIL_LENGTH, t, "email_address", &self.email, 255)?;
        require(constraints::PHONE_REQUIRED, t, "phone", &self.phone)?;
        max_length(constraints::PHONE_LENGTH, t, "phone", &self.phone, 20)?;
        require(constraints::PASSWORD_REQUIRED, t, "password", &self.password)?;
        max_length(constraints::PASSWORD_LENGTH, t, "password", &self.password, 25)?;
        Ok(())
    }
}

/// New contact details for an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactUpdate {
    pub email: String,
    pub phone: String,
}

impl ContactUpdate {
    pub fn new(email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone: phone.into(),
        }
    }

    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let t = User::TABLE;
        require(constraints::EMAIL_REQUIRED, t, "email_address", &self.email)?;
        max_length(constraints::EMAIL_LENGTH, t, "email_address", &self.email, 255)?;
        require(constraints::PHONE_REQUIRED, t, "phone", &self.phone)?;
        max_length(constraints::PHONE_LENGTH, t, "phone", &self.phone, 20)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookiemon() -> NewUser {
        NewUser::new("cookiemon", "mon@cookie.com", "111-111-1111", "password")
    }

    #[test]
    fn valid_signup_passes() {
        assert!(cookiemon().validate().is_ok());
    }

    #[test]
    fn username_is_required() {
        let mut user = cookiemon();
        user.username = String::new();
        let err = user.validate().unwrap_err();
        assert_eq!(err.constraint, constraints::USERNAME_REQUIRED);
    }

    #[test]
    fn username_is_limited_to_fifteen_characters() {
        let mut user = cookiemon();
        user.username = "a".repeat(16);
        let err = user.validate().unwrap_err();
        assert_eq!(err.constraint, constraints::USERNAME_LENGTH);
    }

    #[test]
    fn password_is_not_serialized() {
        let user = User {
            id: UserId::new(1),
            username: "cookiemon".into(),
            email: "mon@cookie.com".into(),
            phone: "111-111-1111".into(),
            password: "password".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "cookiemon");
    }

    #[test]
    fn contact_update_checks_phone_length() {
        let update = ContactUpdate::new("mon@cookie.com", "1".repeat(21));
        let err = update.validate().unwrap_err();
        assert_eq!(err.constraint, constraints::PHONE_LENGTH);
    }
}
