//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the classifier/anomaly configuration
//! - `ai_client` - AI backend from the environment, if configured
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use paisa_core::config::default_config_path;
use paisa_core::{AIClient, Database, PaisaConfig};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_config(path: Option<&Path>) -> Result<PaisaConfig> {
    PaisaConfig::load(path).context("Failed to load configuration")
}

/// AI backend from environment variables, announced on stdout
pub fn ai_client() -> Option<AIClient> {
    let client = AIClient::from_env();
    match &client {
        Some(client) => println!("   🤖 AI fallback: {}", client.backend_name()),
        None => println!("   💡 Tip: Set OLLAMA_HOST or PAISA_AI_ENDPOINT for AI classification"),
    }
    client
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool, config: Option<&Path>) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;
    let config = load_config(config)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }
    println!("   🕒 Timezone: {}", config.timezone);
    println!(
        "   📚 Rules: {} vendors, {} keyword clusters",
        config.rules.vendors.len(),
        config.rules.clusters.len()
    );
    if let Some(path) = default_config_path() {
        println!("   ⚙️  Config override: {}", path.display());
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set a baseline: paisa baseline set Food 300");
    println!("  2. Ingest a message: paisa ingest --source sms --sender VM-HDFCBK \"Rs 450 paid to Zomato\"");

    Ok(())
}
