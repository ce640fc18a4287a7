use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::auth;
use crate::classifier::{Classification, FoodClassifier};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::notifier::{LogSink, Notifier};
use crate::pet::{Mood, PetState};
use crate::sentiment::{InteractionAnalysis, SentimentAnalyzer};
use crate::store::PetStore;
use crate::todo::TodoItem;
use crate::user::{NewUser, User, UserView};

/// Pet state as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PetStateView {
    pub pet_name: String,
    pub health_points: i32,
    pub mood: Mood,
}

/// The boundary every external event passes through: validate, load,
/// apply the matching mutator atomically, return the updated state.
pub struct UpdateGateway {
    store: Arc<Mutex<PetStore>>,
    classifier: FoodClassifier,
    sentiment: SentimentAnalyzer,
    notifier: Notifier,
    token_secret: String,
}

impl UpdateGateway {
    pub fn new(config: &Config, store: Arc<Mutex<PetStore>>) -> Result<Self> {
        Ok(UpdateGateway {
            store,
            classifier: FoodClassifier::new(config.classifier.clone())?,
            sentiment: SentimentAnalyzer::new(config.sentiment.clone()),
            notifier: Notifier::new(
                Box::new(LogSink),
                Duration::from_millis(config.notify_min_interval_ms),
            ),
            token_secret: config.token_secret.clone(),
        })
    }

    /// Resolve an `Authorization` header value to a user id.
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<String> {
        let header = auth_header
            .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".to_string()))?;
        let token = auth::bearer_token(header)?;
        let claims = auth::verify_token(&self.token_secret, token)?;
        Ok(claims.user_id)
    }

    // ---- accounts ----

    pub async fn register(&self, new_user: NewUser) -> Result<(String, UserView)> {
        new_user.validate()?;

        let store = self.store.lock().await;
        if store.find_user_by_email(&new_user.email)?.is_some() {
            return Err(AppError::Validation("User already registered".to_string()));
        }

        let salt = auth::generate_salt();
        let hash = auth::hash_password(&new_user.password, &salt);
        let user = User::new(
            &new_user.first_name,
            &new_user.last_name,
            &new_user.email,
            &salt,
            &hash,
            &new_user.pet_name,
        );

        store.create_user(&user)?;
        let token = auth::issue_token(&self.token_secret, &user.id)?;
        Ok((token, UserView::from(&user)))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(String, UserView)> {
        // Same error for a wrong email and a wrong password.
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let store = self.store.lock().await;
        let user = store.find_user_by_email(email)?.ok_or_else(invalid)?;

        if !auth::verify_password(password, &user.password_salt, &user.password_hash) {
            return Err(invalid());
        }

        let token = auth::issue_token(&self.token_secret, &user.id)?;
        Ok((token, UserView::from(&user)))
    }

    pub async fn me(&self, user_id: &str) -> Result<UserView> {
        let store = self.store.lock().await;
        let user = store.get_user(user_id)?;
        Ok(UserView::from(&user))
    }

    // ---- todos ----

    pub async fn create_todo(&self, user_id: &str, description: &str) -> Result<TodoItem> {
        let todo = TodoItem::new(user_id, description)?;
        let store = self.store.lock().await;
        store.get_user(user_id)?;
        store.create_todo(&todo)?;
        Ok(todo)
    }

    pub async fn list_todos(&self, user_id: &str) -> Result<Vec<TodoItem>> {
        self.store.lock().await.list_todos(user_id)
    }

    pub async fn get_todo(&self, user_id: &str, todo_id: &str) -> Result<TodoItem> {
        self.store.lock().await.get_todo(user_id, todo_id)
    }

    pub async fn delete_todo(&self, user_id: &str, todo_id: &str) -> Result<()> {
        self.store.lock().await.delete_todo(user_id, todo_id)
    }

    /// Mark a todo done and step the pet's mood. Completing an
    /// already-completed todo reports `AlreadyCompleted` and mutates
    /// nothing.
    pub async fn complete_todo(&self, user_id: &str, todo_id: &str) -> Result<PetState> {
        self.store.lock().await.complete_todo(user_id, todo_id)
    }

    // ---- pet ----

    /// Classify a food photo and feed the result to the pet.
    ///
    /// Fail-closed: a classifier failure aborts the operation before any
    /// mutation. A classifier success followed by a persistence failure
    /// surfaces as an error too; the mutation itself is a single atomic
    /// store update.
    pub async fn classify_food(
        &self,
        user_id: &str,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<(Classification, PetState)> {
        if image.is_empty() {
            return Err(AppError::Validation("No image provided".to_string()));
        }

        self.store.lock().await.get_user(user_id)?;

        let classification = self.classifier.classify(image, filename).await?;

        let state = self
            .store
            .lock()
            .await
            .update_state(user_id, |s| s.apply_food_classification(classification.category))?;

        Ok((classification, state))
    }

    /// Score a spoken interaction and apply its impact.
    ///
    /// The sentiment call is fail-open: an upstream failure degrades to a
    /// neutral analysis and the operation still succeeds.
    pub async fn record_interaction(
        &self,
        user_id: &str,
        speech: &str,
    ) -> Result<(InteractionAnalysis, PetState)> {
        if speech.trim().is_empty() {
            return Err(AppError::Validation("Speech content is required".to_string()));
        }

        self.store.lock().await.get_user(user_id)?;

        let analysis = self.sentiment.analyze(speech).await;

        let state = self
            .store
            .lock()
            .await
            .update_state(user_id, |s| s.apply_interaction_score(analysis.mood_impact))?;

        Ok((analysis, state))
    }

    /// Current pet state, also handed to the notifier (throttled).
    pub async fn pet_state(&self, user_id: &str) -> Result<PetStateView> {
        let store = self.store.lock().await;
        let user = store.get_user(user_id)?;

        self.notifier.push(&user.state);

        Ok(PetStateView {
            pet_name: user.pet_name,
            health_points: user.state.health_points,
            mood: user.state.mood,
        })
    }
}
