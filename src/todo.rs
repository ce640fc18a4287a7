use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{AppError, Result};

/// A single to-do item owned by one user.
///
/// `completed` is monotonic: it only ever moves from false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier using ULID (time-sortable)
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn new(user_id: &str, description: &str) -> Result<Self> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }

        let now = Utc::now();
        Ok(TodoItem {
            id: Ulid::new().to_string(),
            user_id: user_id.to_string(),
            description: description.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }
}
