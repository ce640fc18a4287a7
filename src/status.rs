use std::path::PathBuf;
use anyhow::Result;
use colored::*;

use crate::config::Config;
use crate::store::PetStore;

pub async fn handle_status(email: &str, data_dir: Option<PathBuf>) -> Result<()> {
    // Load configuration
    let config = Config::new(data_dir)?;
    let store = PetStore::new(config.db_file())?;

    let Some(user) = store.find_user_by_email(email)? else {
        println!("{}: {}", "No account found for".yellow(), email);
        return Ok(());
    };

    // Display pet status
    println!("{}", "aipet Status".cyan().bold());
    println!("Pet: {}", user.pet_name);
    println!("Health: {}/100", user.state.health_points);
    println!("Mood: {}", user.state.mood);

    let todos = store.list_todos(&user.id)?;
    let open = todos.iter().filter(|t| !t.completed).count();
    println!("\n{}", "Todos".cyan().bold());
    println!("{} open / {} total", open, todos.len());

    Ok(())
}

pub async fn handle_tick(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = PetStore::new(config.db_file())?;

    let moods = store.mood_decay_sweep()?;
    let health = store.health_decay_sweep()?;

    println!("Mood sweep regressed {} users", moods);
    println!("Health sweep decremented {} users", health);

    Ok(())
}
