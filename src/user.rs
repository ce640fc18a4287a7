use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{AppError, Result};
use crate::pet::{Mood, PetState};

/// A registered account and its embedded pet state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub pet_name: String,
    pub state: PetState,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        password_salt: &str,
        password_hash: &str,
        pet_name: &str,
    ) -> Self {
        User {
            id: Ulid::new().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password_salt: password_salt.to_string(),
            password_hash: password_hash.to_string(),
            pet_name: pet_name.to_string(),
            state: PetState::default(),
            created_at: Utc::now(),
        }
    }
}

/// Registration payload, validated before any account is created.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub pet_name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if self.first_name.is_empty() || self.first_name.len() > 50 {
            return Err(AppError::Validation(
                "First name must be 1-50 characters".to_string(),
            ));
        }
        if self.last_name.is_empty() || self.last_name.len() > 50 {
            return Err(AppError::Validation(
                "Last name must be 1-50 characters".to_string(),
            ));
        }
        if self.email.len() < 5 || self.email.len() > 255 || !self.email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if self.password.len() < 5 || self.password.len() > 255 {
            return Err(AppError::Validation(
                "Password must be 5-255 characters".to_string(),
            ));
        }
        if self.pet_name.is_empty() || self.pet_name.len() > 255 {
            return Err(AppError::Validation(
                "Pet name must be 1-255 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Public projection of a user: everything except credentials.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub pet_name: String,
    pub health_points: i32,
    pub mood: Mood,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            pet_name: user.pet_name.clone(),
            health_points: user.state.health_points,
            mood: user.state.mood,
        }
    }
}
