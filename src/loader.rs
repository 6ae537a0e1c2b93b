//! Loads seed data (contacts, checks) into the store at startup.
//!
//! Seed files are JSON arrays of entity payloads. Every payload passes
//! through the entity registry's validator before anything is written; a
//! single invalid payload rejects the whole file.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{Check, Contact, ValidationError};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{CheckRepository, ContactRepository};
use crate::registry::{EntityKind, EntityRegistry};

/// Errors that can occur while loading seed data.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The seed file could not be read.
    #[error("Failed to read seed file '{path}': {source}")]
    Io {
        /// The offending path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The seed file is not a JSON array of entity payloads.
    #[error("Failed to parse seed file '{path}': {source}")]
    Parse {
        /// The offending path.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload failed entity validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store rejected a write.
    #[error("Failed to store seed data: {0}")]
    Store(#[from] PersistenceError),
}

/// Loads and validates seed files into the store at startup.
pub struct SeedLoader {
    config: AppConfig,
    checks: Arc<dyn CheckRepository>,
    contacts: Arc<dyn ContactRepository>,
    registry: EntityRegistry,
}

impl SeedLoader {
    /// Creates a loader for the configured seed files.
    pub fn new(
        config: AppConfig,
        checks: Arc<dyn CheckRepository>,
        contacts: Arc<dyn ContactRepository>,
    ) -> Self {
        Self { config, checks, contacts, registry: EntityRegistry::new() }
    }

    /// Runs the load. Files already reflected in the store are skipped so
    /// restarts do not clobber live data.
    pub async fn run(&self) -> Result<(), LoaderError> {
        if let Some(path) = self.config.contacts_path.clone() {
            self.load_contacts(&path).await?;
        }
        if let Some(path) = self.config.checks_path.clone() {
            self.load_checks(&path).await?;
        }
        Ok(())
    }

    async fn load_contacts(&self, path: &Path) -> Result<(), LoaderError> {
        if !self.contacts.all_contacts().await?.is_empty() {
            tracing::info!("Contacts already present in the store, skipping seed file.");
            return Ok(());
        }

        let payloads = read_payloads(path)?;
        let mut contacts = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            self.registry.validate(EntityKind::Contact, payload)?;
            let contact: Contact = serde_json::from_value(payload.clone())
                .map_err(|e| ValidationError::Malformed(e.to_string()))?;
            contacts.push(contact);
        }
        for contact in &contacts {
            self.contacts.upsert_contact(contact).await?;
        }
        tracing::info!(count = contacts.len(), path = %path.display(), "Loaded seed contacts.");
        Ok(())
    }

    async fn load_checks(&self, path: &Path) -> Result<(), LoaderError> {
        if !self.checks.all_checks().await?.is_empty() {
            tracing::info!("Checks already present in the store, skipping seed file.");
            return Ok(());
        }

        let payloads = read_payloads(path)?;
        let mut checks = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            self.registry.validate(EntityKind::Check, payload)?;
            let check: Check = serde_json::from_value(payload.clone())
                .map_err(|e| ValidationError::Malformed(e.to_string()))?;
            checks.push(check);
        }
        for check in &checks {
            self.checks.upsert_check(check).await?;
        }
        tracing::info!(count = checks.len(), path = %path.display(), "Loaded seed checks.");
        Ok(())
    }
}

fn read_payloads(path: &Path) -> Result<Vec<serde_json::Value>, LoaderError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| LoaderError::Io { path: path.display().to_string(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| LoaderError::Parse { path: path.display().to_string(), source })
}
