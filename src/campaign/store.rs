//! Campaign persistence.
//!
//! The store is a single versioned aggregate, read wholesale at the start
//! of a run and written back wholesale at the end — one writer per run
//! cycle, no locking. A malformed file is replaced with an empty versioned
//! default (logged as a warning) so the daily run keeps going; losing
//! history is preferred over halting.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{Campaign, CampaignStatus};

/// Current store schema version.
pub const STORE_VERSION: u32 = 1;

/// Durable collection of campaigns plus update timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStore {
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
    pub campaigns: Vec<Campaign>,
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: None,
            campaigns: Vec::new(),
        }
    }
}

impl CampaignStore {
    /// Load the store, recovering from absence or corruption.
    ///
    /// Missing file means a fresh start; a file that fails to parse is
    /// replaced by the default — the warning is the only trace of the old
    /// content, so callers that must not lose state should use
    /// `load_strict`.
    pub fn load(path: &Path) -> Self {
        match Self::load_strict(path) {
            Ok(Some(store)) => {
                info!(
                    path = %path.display(),
                    campaigns = store.campaigns.len(),
                    active = store.active().count(),
                    "Campaign store loaded"
                );
                store
            }
            Ok(None) => {
                info!(path = %path.display(), "No campaign store found, starting fresh");
                Self::default()
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Campaign store unreadable — replacing with empty default"
                );
                Self::default()
            }
        }
    }

    /// Load without recovery: `None` if the file does not exist, an error
    /// if it exists but cannot be parsed.
    pub fn load_strict(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read campaign store from {}", path.display()))?;
        let store: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse campaign store from {}", path.display()))?;
        Ok(Some(store))
    }

    /// Persist the whole aggregate, stamping `updated_at`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Some(Utc::now());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialise campaign store")?;
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write campaign store to {}", path.display()))?;

        debug!(
            path = %path.display(),
            campaigns = self.campaigns.len(),
            "Campaign store saved"
        );
        Ok(())
    }

    pub fn active(&self) -> impl Iterator<Item = &Campaign> {
        self.with_status(CampaignStatus::Active)
    }

    pub fn with_status(&self, status: CampaignStatus) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter().filter(move |c| c.status == status)
    }

    pub fn find(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
