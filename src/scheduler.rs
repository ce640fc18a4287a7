use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::store::PetStore;

/// Fires the two decay sweeps on a fixed cadence.
///
/// The sweeps are independent bulk updates: mood regresses one step for
/// every user, health drops by one for every user above zero. A failed
/// sweep is logged and the loop keeps going; the next tick retries it
/// naturally.
pub struct DecayScheduler {
    store: Arc<Mutex<PetStore>>,
    interval: Duration,
}

impl DecayScheduler {
    pub fn new(store: Arc<Mutex<PetStore>>, interval: Duration) -> Self {
        DecayScheduler { store, interval }
    }

    /// Run forever. Spawn this on its own task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so a fresh server
        // does not decay everyone at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One decay cycle: mood sweep, then health sweep.
    pub async fn tick(&self) {
        let mut store = self.store.lock().await;

        match store.mood_decay_sweep() {
            Ok(changed) => info!("Mood decay sweep regressed {} users", changed),
            Err(e) => error!("Mood decay sweep failed: {}", e),
        }

        match store.health_decay_sweep() {
            Ok(changed) => info!("Health decay sweep decremented {} users", changed),
            Err(e) => error!("Health decay sweep failed: {}", e),
        }
    }
}
