//! Shared helpers for the maintenance CLI

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use timeline_core::{Config, ProcessingConfig};
use timeline_db::MediaRepository;
use timeline_processing::Reconciler;
use timeline_storage::LocalStorage;

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Pipeline settings from the environment, or the defaults when the full
/// server configuration is not available.
pub fn processing_config() -> ProcessingConfig {
    match Config::from_env() {
        Ok(config) => config.processing().clone(),
        Err(e) => {
            tracing::debug!(error = %e, "Using default processing settings");
            ProcessingConfig::default()
        }
    }
}

/// Reconciler over the configured upload directory. With `lazy` the database
/// is only contacted once a record is actually read.
pub async fn reconciler(config: &Config, lazy: bool) -> anyhow::Result<Reconciler> {
    let options = PgPoolOptions::new().max_connections(2);
    let pool = if lazy {
        options
            .connect_lazy(config.database_url())
            .context("Invalid DATABASE_URL")?
    } else {
        options
            .connect(config.database_url())
            .await
            .context("Failed to connect to database")?
    };

    let storage = LocalStorage::new(config.upload_dir().clone(), config.upload_url_prefix())
        .await
        .with_context(|| format!("Upload directory {} unusable", config.upload_dir().display()))?;

    Ok(Reconciler::new(storage, Arc::new(MediaRepository::new(pool))))
}

/// Bcrypt hashes for seeding the users table, one per password.
pub fn hash_passwords(passwords: &[String], cost: u32) -> anyhow::Result<Vec<String>> {
    passwords
        .iter()
        .map(|pw| bcrypt::hash(pw, cost).context("Failed to hash password"))
        .collect()
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_passwords_verify() {
        let hashes = hash_passwords(&["secret".to_string(), "other".to_string()], 4).unwrap();
        assert_eq!(hashes.len(), 2);
        assert!(bcrypt::verify("secret", &hashes[0]).unwrap());
        assert!(!bcrypt::verify("secret", &hashes[1]).unwrap());
    }

    #[test]
    fn test_hash_passwords_empty() {
        assert!(hash_passwords(&[], 4).unwrap().is_empty());
    }
}
