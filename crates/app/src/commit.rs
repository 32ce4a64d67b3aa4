use chrono::Utc;
use tariffscan_core::{fingerprint, ExtractionResult, ParsedItem};
use tariffscan_storage::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// The stabilizer flagged a stable result.
    Auto,
    /// The user asked to save what is on screen.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Saved(usize),
    /// Same items as the previous commit.
    Duplicate,
    /// No item had both a code and a name.
    NothingToSave,
}

/// Saves complete items, skipping a repeat of the last committed set.
pub struct Committer {
    pool: DbPool,
    last_key: Option<String>,
}

impl Committer {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, last_key: None }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn commit(
        &mut self,
        result: &ExtractionResult,
        trigger: CommitTrigger,
    ) -> Result<CommitOutcome, sqlx::Error> {
        let complete: Vec<ParsedItem> =
            result.items.iter().filter(|i| i.is_complete()).cloned().collect();

        if complete.is_empty() {
            match trigger {
                CommitTrigger::Manual => tracing::info!("HS code / item name not detected yet"),
                CommitTrigger::Auto => tracing::debug!("stable result has no complete item"),
            }
            return Ok(CommitOutcome::NothingToSave);
        }

        let key = fingerprint(&complete);
        if self.last_key.as_deref() == Some(key.as_str()) {
            tracing::debug!(key = %key, "already saved");
            return Ok(CommitOutcome::Duplicate);
        }

        let ids = tariffscan_storage::save_scans(&self.pool, &complete, &result.raw_text, Utc::now()).await?;
        tracing::info!(?trigger, count = ids.len(), key = %key, "scan saved");
        self.last_key = Some(key);
        Ok(CommitOutcome::Saved(ids.len()))
    }

    /// Empties the store and forgets the last committed set.
    pub async fn clear(&mut self) -> Result<u64, sqlx::Error> {
        let removed = tariffscan_storage::clear_scans(&self.pool).await?;
        self.last_key = None;
        Ok(removed)
    }
}
