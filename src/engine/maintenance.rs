//! Maintenance-window lifecycle: the start/end bookkeeping of the
//! scheduled and unscheduled window collections of a check.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CheckId, MaintenanceKind, MaintenanceWindow, ValidationError};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::MaintenanceStore;

/// Errors raised by maintenance operations.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// The window payload failed validation; nothing was applied.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The referenced window does not exist. Reported so the caller can
    /// surface it; never fatal.
    #[error("No {kind} maintenance window {id} for check '{check}'")]
    NotFound {
        /// The check whose collection was searched.
        check: CheckId,
        /// The collection searched.
        kind: MaintenanceKind,
        /// The missing window id.
        id: Uuid,
    },

    /// The underlying store failed.
    #[error("Maintenance store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Manages the two independent ordered window collections of each check.
pub struct MaintenanceTracker<S: MaintenanceStore + ?Sized> {
    store: Arc<S>,
}

impl<S: MaintenanceStore + ?Sized> MaintenanceTracker<S> {
    /// Creates a tracker over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Inserts a scheduled window. Overlap with existing scheduled windows
    /// is allowed.
    pub async fn add_scheduled(
        &self,
        check: &CheckId,
        start_time: i64,
        end_time: i64,
        summary: &str,
    ) -> Result<MaintenanceWindow, MaintenanceError> {
        let window = MaintenanceWindow::new(start_time, end_time, summary)?;
        self.store.add_window(check, MaintenanceKind::Scheduled, &window).await?;
        tracing::info!(check = %check, window = %window.id, start_time, end_time,
            "Scheduled maintenance window added.");
        Ok(window)
    }

    /// Opens an unscheduled window, truncating any window still open at
    /// the new start time: a new incident pre-empts the current open
    /// maintenance. Replaying the truncation is idempotent.
    pub async fn set_unscheduled(
        &self,
        check: &CheckId,
        start_time: i64,
        end_time: i64,
        summary: &str,
    ) -> Result<MaintenanceWindow, MaintenanceError> {
        let window = MaintenanceWindow::new(start_time, end_time, summary)?;

        let open = self
            .store
            .open_windows_at(check, MaintenanceKind::Unscheduled, start_time)
            .await?;
        for previous in open {
            tracing::debug!(check = %check, window = %previous.id, truncated_to = start_time,
                "Truncating open unscheduled maintenance window.");
            self.apply_end(check, MaintenanceKind::Unscheduled, &previous, start_time).await?;
        }

        self.store.add_window(check, MaintenanceKind::Unscheduled, &window).await?;
        tracing::info!(check = %check, window = %window.id, start_time, end_time,
            "Unscheduled maintenance window set.");
        Ok(window)
    }

    /// Ends a window at `at`: deleted when it never took effect
    /// (`at <= start`), shortened when currently in effect, untouched when
    /// already finished — past windows are immutable.
    pub async fn end_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        id: Uuid,
        at: i64,
    ) -> Result<(), MaintenanceError> {
        let window = self
            .store
            .find_window(check, kind, id)
            .await?
            .ok_or(MaintenanceError::NotFound { check: check.clone(), kind, id })?;
        self.apply_end(check, kind, &window, at).await
    }

    /// Ends the currently open unscheduled window, if any. Clearing when
    /// nothing is open is reported as not found.
    pub async fn clear_unscheduled(
        &self,
        check: &CheckId,
        at: i64,
    ) -> Result<(), MaintenanceError> {
        let open = self.store.open_windows_at(check, MaintenanceKind::Unscheduled, at).await?;
        let current = open.into_iter().max_by_key(|w| w.end_time).ok_or(
            MaintenanceError::NotFound {
                check: check.clone(),
                kind: MaintenanceKind::Unscheduled,
                id: Uuid::nil(),
            },
        )?;
        self.apply_end(check, MaintenanceKind::Unscheduled, &current, at).await
    }

    /// True iff any window in the collection covers `t`.
    pub async fn in_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        t: i64,
    ) -> Result<bool, MaintenanceError> {
        Ok(!self.store.open_windows_at(check, kind, t).await?.is_empty())
    }

    /// The window in effect at `t`, or `None`. When several overlap (only
    /// possible for scheduled windows), the one with the latest end time —
    /// the longest remaining coverage — wins.
    pub async fn current_window(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        t: i64,
    ) -> Result<Option<MaintenanceWindow>, MaintenanceError> {
        let open = self.store.open_windows_at(check, kind, t).await?;
        Ok(open.into_iter().max_by_key(|w| w.end_time))
    }

    /// Windows strictly overlapping `[from, to)`, for the report engine.
    pub async fn windows_intersecting(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<MaintenanceWindow>, MaintenanceError> {
        Ok(self.store.windows_intersecting(check, kind, from, to).await?)
    }

    async fn apply_end(
        &self,
        check: &CheckId,
        kind: MaintenanceKind,
        window: &MaintenanceWindow,
        at: i64,
    ) -> Result<(), MaintenanceError> {
        if at <= window.start_time {
            // never took effect
            self.store.delete_window(check, kind, window.id).await?;
        } else if at < window.end_time {
            self.store.update_window_end(check, kind, window.id, at).await?;
        }
        // at >= end_time: already finished, immutable
        Ok(())
    }
}
