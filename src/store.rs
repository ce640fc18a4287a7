use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::pet::{Mood, PetState};
use crate::todo::TodoItem;
use crate::user::User;

/// SQLite-backed storage for users (with their embedded pet state) and todos.
///
/// Every pet-state mutation runs inside a transaction as a
/// read-modify-write, so a decay sweep racing a user request cannot lose
/// either update. The bulk sweeps are single UPDATE statements.
pub struct PetStore {
    conn: Connection,
}

impl PetStore {
    /// Open (or create) the store at the given database path.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_salt TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                pet_name TEXT NOT NULL,
                health_points INTEGER NOT NULL,
                mood TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                description TEXT NOT NULL,
                completed INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_user_id ON todos(user_id)",
            [],
        )?;

        Ok(())
    }

    // ---- users ----

    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, first_name, last_name, email, password_salt,
                                password_hash, pet_name, health_points, mood, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &user.id,
                &user.first_name,
                &user.last_name,
                &user.email,
                &user.password_salt,
                &user.password_hash,
                &user.pet_name,
                user.state.health_points,
                user.state.mood.to_string(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<User> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, email, password_salt, password_hash,
                    pet_name, health_points, mood, created_at
             FROM users WHERE id = ?1",
        )?;

        stmt.query_row(params![id], row_to_user)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("User".to_string()),
                other => AppError::Persistence(other),
            })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, email, password_salt, password_hash,
                    pet_name, health_points, mood, created_at
             FROM users WHERE email = ?1",
        )?;

        match stmt.query_row(params![email], row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::Persistence(e)),
        }
    }

    // ---- pet state ----

    pub fn load_state(&self, user_id: &str) -> Result<PetState> {
        let mut stmt = self
            .conn
            .prepare("SELECT health_points, mood FROM users WHERE id = ?1")?;

        stmt.query_row(params![user_id], row_to_state)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("User".to_string()),
                other => AppError::Persistence(other),
            })
    }

    /// Atomically apply a pure mutator to one user's pet state.
    ///
    /// The load and the write happen inside a single transaction, so the
    /// mutator never runs against stale data.
    pub fn update_state<F>(&mut self, user_id: &str, mutate: F) -> Result<PetState>
    where
        F: FnOnce(PetState) -> PetState,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let state = tx
            .query_row(
                "SELECT health_points, mood FROM users WHERE id = ?1",
                params![user_id],
                row_to_state,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("User".to_string()),
                other => AppError::Persistence(other),
            })?;

        let next = mutate(state);

        tx.execute(
            "UPDATE users SET health_points = ?1, mood = ?2 WHERE id = ?3",
            params![next.health_points, next.mood.to_string(), user_id],
        )?;

        tx.commit()?;
        Ok(next)
    }

    // ---- decay sweeps ----

    /// Mood regression sweep: neutral -> sad first, then happy -> neutral.
    /// Running neutral -> sad first means a happy pet regresses exactly one
    /// step per tick. Both updates commit together.
    pub fn mood_decay_sweep(&mut self) -> Result<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let neutral_to_sad = tx.execute("UPDATE users SET mood = 'sad' WHERE mood = 'neutral'", [])?;
        let happy_to_neutral =
            tx.execute("UPDATE users SET mood = 'neutral' WHERE mood = 'happy'", [])?;

        tx.commit()?;
        Ok(neutral_to_sad + happy_to_neutral)
    }

    /// Health decay sweep: decrement every pet above zero by one.
    pub fn health_decay_sweep(&mut self) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE users SET health_points = health_points - 1 WHERE health_points > 0",
            [],
        )?;
        Ok(changed)
    }

    // ---- todos ----

    pub fn create_todo(&self, todo: &TodoItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO todos (id, user_id, description, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &todo.id,
                &todo.user_id,
                &todo.description,
                todo.completed as i32,
                todo.created_at.to_rfc3339(),
                todo.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All todos for a user, newest first.
    pub fn list_todos(&self, user_id: &str) -> Result<Vec<TodoItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, description, completed, created_at, updated_at
             FROM todos WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;

        let todos = stmt
            .query_map(params![user_id], row_to_todo)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(todos)
    }

    pub fn get_todo(&self, user_id: &str, todo_id: &str) -> Result<TodoItem> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, description, completed, created_at, updated_at
             FROM todos WHERE id = ?1 AND user_id = ?2",
        )?;

        stmt.query_row(params![todo_id, user_id], row_to_todo)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("Todo".to_string()),
                other => AppError::Persistence(other),
            })
    }

    pub fn delete_todo(&self, user_id: &str, todo_id: &str) -> Result<()> {
        let rows_affected = self.conn.execute(
            "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
            params![todo_id, user_id],
        )?;

        if rows_affected == 0 {
            return Err(AppError::NotFound("Todo".to_string()));
        }

        Ok(())
    }

    /// Mark a todo completed and step the owner's mood, all-or-nothing.
    ///
    /// Completion is monotonic: a second call reports `AlreadyCompleted`
    /// and leaves both the todo and the pet state untouched.
    pub fn complete_todo(&mut self, user_id: &str, todo_id: &str) -> Result<PetState> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let completed: bool = tx
            .query_row(
                "SELECT completed FROM todos WHERE id = ?1 AND user_id = ?2",
                params![todo_id, user_id],
                |row| row.get::<_, i32>(0).map(|v| v != 0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("Todo".to_string()),
                other => AppError::Persistence(other),
            })?;

        if completed {
            return Err(AppError::AlreadyCompleted);
        }

        tx.execute(
            "UPDATE todos SET completed = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), todo_id],
        )?;

        let state = tx
            .query_row(
                "SELECT health_points, mood FROM users WHERE id = ?1",
                params![user_id],
                row_to_state,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("User".to_string()),
                other => AppError::Persistence(other),
            })?;

        let next = state.apply_todo_completion();

        tx.execute(
            "UPDATE users SET health_points = ?1, mood = ?2 WHERE id = ?3",
            params![next.health_points, next.mood.to_string(), user_id],
        )?;

        tx.commit()?;
        Ok(next)
    }
}

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<PetState> {
    let mood: String = row.get(1)?;
    Ok(PetState {
        health_points: row.get(0)?,
        mood: mood.parse::<Mood>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let mood: String = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_salt: row.get(4)?,
        password_hash: row.get(5)?,
        pet_name: row.get(6)?,
        state: PetState {
            health_points: row.get(7)?,
            mood: mood.parse::<Mood>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })?,
        },
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    9,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
    })
}

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    let completed: i32 = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(TodoItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        completed: completed != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::FoodCategory;

    fn create_test_store() -> PetStore {
        PetStore::in_memory().unwrap()
    }

    fn test_user(email: &str) -> User {
        User::new("Test", "User", email, "salt", "hash", "Kitty")
    }

    #[test]
    fn test_create_and_get_user() {
        let store = create_test_store();
        let user = test_user("a@example.com");

        store.create_user(&user).unwrap();
        let loaded = store.get_user(&user.id).unwrap();

        assert_eq!(loaded.email, "a@example.com");
        assert_eq!(loaded.state.health_points, 100);
        assert_eq!(loaded.state.mood, Mood::Neutral);
    }

    #[test]
    fn test_find_user_by_email() {
        let store = create_test_store();
        let user = test_user("b@example.com");
        store.create_user(&user).unwrap();

        assert!(store.find_user_by_email("b@example.com").unwrap().is_some());
        assert!(store.find_user_by_email("missing@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = create_test_store();
        store.create_user(&test_user("dup@example.com")).unwrap();
        assert!(store.create_user(&test_user("dup@example.com")).is_err());
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let store = create_test_store();
        assert!(matches!(
            store.get_user("missing"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.load_state("missing"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_state_applies_mutator() {
        let mut store = create_test_store();
        let user = test_user("c@example.com");
        store.create_user(&user).unwrap();

        let next = store
            .update_state(&user.id, |s| s.apply_food_classification(FoodCategory::JunkFood))
            .unwrap();

        assert_eq!(next.health_points, 100); // clamped at max
        assert_eq!(next.mood, Mood::Sad);
        assert_eq!(store.load_state(&user.id).unwrap(), next);
    }

    #[test]
    fn test_mood_sweep_single_step_per_tick() {
        let mut store = create_test_store();
        let user = test_user("d@example.com");
        store.create_user(&user).unwrap();
        store
            .update_state(&user.id, |s| PetState { mood: Mood::Happy, ..s })
            .unwrap();

        store.mood_decay_sweep().unwrap();
        assert_eq!(store.load_state(&user.id).unwrap().mood, Mood::Neutral);

        store.mood_decay_sweep().unwrap();
        assert_eq!(store.load_state(&user.id).unwrap().mood, Mood::Sad);

        // Sad is the floor; a further sweep changes nothing.
        store.mood_decay_sweep().unwrap();
        assert_eq!(store.load_state(&user.id).unwrap().mood, Mood::Sad);
    }

    #[test]
    fn test_health_sweep_decrements_and_floors() {
        let mut store = create_test_store();
        let user = test_user("e@example.com");
        store.create_user(&user).unwrap();

        store.health_decay_sweep().unwrap();
        assert_eq!(store.load_state(&user.id).unwrap().health_points, 99);

        store
            .update_state(&user.id, |s| PetState { health_points: 0, ..s })
            .unwrap();
        let changed = store.health_decay_sweep().unwrap();
        assert_eq!(changed, 0);
        assert_eq!(store.load_state(&user.id).unwrap().health_points, 0);
    }

    #[test]
    fn test_decay_schedules_are_independent() {
        let mut store = create_test_store();
        let user = test_user("f@example.com");
        store.create_user(&user).unwrap();

        // Three health ticks, then one mood sweep.
        store.health_decay_sweep().unwrap();
        store.health_decay_sweep().unwrap();
        store.health_decay_sweep().unwrap();

        let state = store.load_state(&user.id).unwrap();
        assert_eq!(state.health_points, 97);
        assert_eq!(state.mood, Mood::Neutral);

        store.mood_decay_sweep().unwrap();
        let state = store.load_state(&user.id).unwrap();
        assert_eq!(state.health_points, 97);
        assert_eq!(state.mood, Mood::Sad);
    }

    #[test]
    fn test_todo_crud() {
        let store = create_test_store();
        let user = test_user("g@example.com");
        store.create_user(&user).unwrap();

        let todo = TodoItem::new(&user.id, "buy catnip").unwrap();
        store.create_todo(&todo).unwrap();

        let listed = store.list_todos(&user.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description, "buy catnip");

        let fetched = store.get_todo(&user.id, &todo.id).unwrap();
        assert!(!fetched.completed);

        store.delete_todo(&user.id, &todo.id).unwrap();
        assert!(matches!(
            store.get_todo(&user.id, &todo.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_todo_owned_by_other_user_is_not_found() {
        let store = create_test_store();
        let alice = test_user("alice@example.com");
        let bob = test_user("bob@example.com");
        store.create_user(&alice).unwrap();
        store.create_user(&bob).unwrap();

        let todo = TodoItem::new(&alice.id, "alice's task").unwrap();
        store.create_todo(&todo).unwrap();

        assert!(matches!(
            store.get_todo(&bob.id, &todo.id),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_todo(&bob.id, &todo.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_complete_todo_steps_mood_once() {
        let mut store = create_test_store();
        let user = test_user("h@example.com");
        store.create_user(&user).unwrap();
        store
            .update_state(&user.id, |s| PetState { mood: Mood::Sad, ..s })
            .unwrap();

        let todo = TodoItem::new(&user.id, "go outside").unwrap();
        store.create_todo(&todo).unwrap();

        let state = store.complete_todo(&user.id, &todo.id).unwrap();
        assert_eq!(state.mood, Mood::Neutral);
        assert!(store.get_todo(&user.id, &todo.id).unwrap().completed);

        // Second completion reports AlreadyCompleted and changes nothing.
        assert!(matches!(
            store.complete_todo(&user.id, &todo.id),
            Err(AppError::AlreadyCompleted)
        ));
        assert_eq!(store.load_state(&user.id).unwrap().mood, Mood::Neutral);
    }
}
