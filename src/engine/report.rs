//! The report engine: derives discrete outage intervals from a check's
//! state history and computes downtime statistics net of scheduled
//! maintenance.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::history::{HistoryError, StateHistory};
use crate::engine::maintenance::{MaintenanceError, MaintenanceTracker};
use crate::models::{CheckId, Condition, MaintenanceKind};
use crate::persistence::error::PersistenceError;
use crate::persistence::traits::{CheckRepository, MaintenanceStore, StateStore};

/// Errors raised by report queries.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The referenced check or tag does not resolve. Distinguishes "no
    /// such entity" from "no data yet".
    #[error("No report subject: {0}")]
    NotFound(String),

    /// State history access failed.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Maintenance window access failed.
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    /// The underlying store failed.
    #[error("Report store error: {0}")]
    Store(#[from] PersistenceError),
}

/// A maximal contiguous interval during which a check was failing.
///
/// Consecutive failing entries of any condition belong to one outage; only
/// a transition through `ok` closes it. The condition and summary are those
/// of the entry that opened the outage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outage {
    /// Condition reported when the outage began.
    pub condition: Condition,
    /// Outage start, clipped to the query range.
    pub start_time: i64,
    /// Outage end: the closing `ok` entry's timestamp, or the query's
    /// upper bound (or now) when still open.
    pub end_time: i64,
    /// `end_time - start_time`.
    pub duration: i64,
    /// Summary of the opening entry.
    pub summary: String,
    /// True when no closing `ok` entry was seen within the query range.
    pub unfinished: bool,
}

/// Downtime statistics for one check over a query range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeReport {
    /// Seconds spent in each condition, net of scheduled maintenance. With
    /// both bounds given, an `ok` row completes the range.
    pub total_seconds: BTreeMap<Condition, i64>,
    /// Share of the query range per condition; `None` when the range is
    /// unbounded (a percentage is undefined without a fixed denominator).
    pub percentages: BTreeMap<Condition, Option<f64>>,
    /// The surviving outage intervals after maintenance subtraction.
    pub downtime: Vec<Outage>,
}

/// Aggregate metadata accompanying a tag-scoped report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReportSummary {
    /// Number of checks carrying the tag.
    pub check_count: usize,
    /// Total outage intervals across those checks.
    pub outage_count: usize,
    /// Total outage seconds across those checks.
    pub total_seconds: i64,
}

/// Per-check outage listings for every check carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOutageReport {
    /// The tag queried.
    pub tag: String,
    /// One entry per check carrying the tag.
    pub checks: Vec<(CheckId, Vec<Outage>)>,
    /// Aggregate statistics over all listed checks.
    pub summary: TagReportSummary,
}

/// Per-check downtime reports for every check carrying a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDowntimeReport {
    /// The tag queried.
    pub tag: String,
    /// One entry per check carrying the tag.
    pub checks: Vec<(CheckId, DowntimeReport)>,
    /// Aggregate statistics over the surviving downtime intervals.
    pub summary: TagReportSummary,
}

/// Walks state history into outage intervals and subtracts maintenance
/// windows to produce downtime statistics.
pub struct ReportEngine {
    checks: Arc<dyn CheckRepository>,
    history: Arc<StateHistory<dyn StateStore>>,
    maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
}

impl ReportEngine {
    /// Creates a report engine over the given services.
    pub fn new(
        checks: Arc<dyn CheckRepository>,
        history: Arc<StateHistory<dyn StateStore>>,
        maintenance: Arc<MaintenanceTracker<dyn MaintenanceStore>>,
    ) -> Self {
        Self { checks, history, maintenance }
    }

    /// Outage intervals for a check within `[from, to]`. Either bound may
    /// be open; an open upper bound runs to now.
    pub async fn outages(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<Outage>, ReportError> {
        self.require_check(check).await?;

        let horizon = to.unwrap_or_else(|| Utc::now().timestamp());

        // the entry before the range establishes the condition active at
        // the left boundary; without a lower bound there is no seed
        let mut walk = Vec::new();
        if let Some(from_ts) = from {
            if let Some(seed) = self.history.entry_before(check, from_ts).await? {
                walk.push(seed);
            }
        }
        walk.extend(self.history.query(check, from, to).await?);

        let mut outages: Vec<Outage> = Vec::new();
        let mut open: Option<Outage> = None;
        for entry in walk.iter().filter(|e| !e.condition.is_pseudo()) {
            if entry.condition.is_failing() {
                if open.is_none() {
                    open = Some(Outage {
                        condition: entry.condition,
                        start_time: entry.timestamp,
                        end_time: horizon,
                        duration: 0,
                        summary: entry.summary.clone(),
                        unfinished: true,
                    });
                }
            } else if let Some(mut outage) = open.take() {
                outage.end_time = entry.timestamp;
                outage.unfinished = false;
                outages.push(outage);
            }
        }
        if let Some(outage) = open {
            outages.push(outage);
        }

        Ok(outages
            .into_iter()
            .filter_map(|mut outage| {
                if let Some(from_ts) = from {
                    outage.start_time = outage.start_time.max(from_ts);
                }
                if outage.end_time <= outage.start_time {
                    return None;
                }
                outage.duration = outage.end_time - outage.start_time;
                Some(outage)
            })
            .collect())
    }

    /// Downtime statistics for a check within `[from, to]`: outages net of
    /// scheduled maintenance, summed per condition.
    pub async fn downtime(
        &self,
        check: &CheckId,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<DowntimeReport, ReportError> {
        let outages = self.outages(check, from, to).await?;
        let windows = self
            .maintenance
            .windows_intersecting(check, MaintenanceKind::Scheduled, from, to)
            .await?;

        // interval subtraction: a fully covered outage is dropped, a
        // partially covered one is shortened, and a window interior to an
        // outage splits it in two
        let mut survivors: Vec<Outage> = Vec::new();
        for outage in &outages {
            let mut fragments = vec![(outage.start_time, outage.end_time)];
            for window in &windows {
                let mut next = Vec::with_capacity(fragments.len() + 1);
                for (start, end) in fragments {
                    if window.start_time < end && window.end_time > start {
                        if start < window.start_time {
                            next.push((start, window.start_time));
                        }
                        if window.end_time < end {
                            next.push((window.end_time, end));
                        }
                    } else {
                        next.push((start, end));
                    }
                }
                fragments = next;
            }
            for (start, end) in fragments {
                survivors.push(Outage {
                    condition: outage.condition,
                    start_time: start,
                    end_time: end,
                    duration: end - start,
                    summary: outage.summary.clone(),
                    unfinished: outage.unfinished && end == outage.end_time,
                });
            }
        }
        survivors.sort_by_key(|o| o.start_time);

        let mut total_seconds: BTreeMap<Condition, i64> = BTreeMap::new();
        for outage in &outages {
            total_seconds.entry(outage.condition).or_insert(0);
        }
        for survivor in &survivors {
            if let Some(total) = total_seconds.get_mut(&survivor.condition) {
                *total += survivor.duration;
            }
        }

        let mut percentages: BTreeMap<Condition, Option<f64>> =
            total_seconds.keys().map(|c| (*c, None)).collect();

        if let (Some(from_ts), Some(to_ts)) = (from, to) {
            let span = to_ts - from_ts;
            if span > 0 && !outages.is_empty() {
                let failing_total: i64 = total_seconds.values().sum();
                for (condition, seconds) in &total_seconds {
                    percentages
                        .insert(*condition, Some(*seconds as f64 * 100.0 / span as f64));
                }
                let failing_pct: f64 = percentages.values().flatten().sum();
                total_seconds.insert(Condition::Ok, span - failing_total);
                percentages.insert(Condition::Ok, Some(100.0 - failing_pct));
            }
        }

        Ok(DowntimeReport { total_seconds, percentages, downtime: survivors })
    }

    /// Outage listings for every check carrying `tag`. A tag no check
    /// carries is reported as not found.
    pub async fn outages_for_tag(
        &self,
        tag: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<TagOutageReport, ReportError> {
        let checks = self.tagged_checks(tag).await?;
        let mut per_check = Vec::with_capacity(checks.len());
        let mut outage_count = 0;
        let mut total_seconds = 0;
        for check in checks {
            let outages = self.outages(&check.id, from, to).await?;
            outage_count += outages.len();
            total_seconds += outages.iter().map(|o| o.duration).sum::<i64>();
            per_check.push((check.id, outages));
        }
        let summary = TagReportSummary { check_count: per_check.len(), outage_count, total_seconds };
        Ok(TagOutageReport { tag: tag.to_string(), checks: per_check, summary })
    }

    /// Downtime reports for every check carrying `tag`.
    pub async fn downtime_for_tag(
        &self,
        tag: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<TagDowntimeReport, ReportError> {
        let checks = self.tagged_checks(tag).await?;
        let mut per_check = Vec::with_capacity(checks.len());
        let mut outage_count = 0;
        let mut total_seconds = 0;
        for check in checks {
            let report = self.downtime(&check.id, from, to).await?;
            outage_count += report.downtime.len();
            total_seconds += report.downtime.iter().map(|o| o.duration).sum::<i64>();
            per_check.push((check.id, report));
        }
        let summary = TagReportSummary { check_count: per_check.len(), outage_count, total_seconds };
        Ok(TagDowntimeReport { tag: tag.to_string(), checks: per_check, summary })
    }

    async fn require_check(&self, check: &CheckId) -> Result<(), ReportError> {
        self.checks
            .find_check(check)
            .await?
            .map(|_| ())
            .ok_or_else(|| ReportError::NotFound(format!("check '{check}'")))
    }

    /// Checks carrying the tag. Disabled checks keep their history but are
    /// excluded from tag-scoped evaluation.
    async fn tagged_checks(
        &self,
        tag: &str,
    ) -> Result<Vec<crate::models::Check>, ReportError> {
        let checks = self.checks.checks_by_tag(tag).await?;
        if checks.is_empty() {
            return Err(ReportError::NotFound(format!("tag '{tag}'")));
        }
        Ok(checks.into_iter().filter(|c| c.enabled).collect())
    }
}
