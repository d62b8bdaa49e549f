//! Per-facet provider health tracking.
//!
//! Each provider facet is tracked independently so a broken review service
//! does not hide a working catalog endpoint. Derived statuses feed the
//! client's health report.

use crate::research::types::Facet;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Health state of one provider facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetStatus {
    /// Recent calls succeed.
    Healthy,
    /// Failures accumulating but the facet still answers sometimes.
    Degraded,
    /// The facet is effectively unusable.
    Down,
}

/// Rolling success/failure record for one facet.
#[derive(Debug)]
struct FacetHealth {
    status: FacetStatus,
    consecutive_failures: u32,
    recent: VecDeque<bool>,
}

impl FacetHealth {
    fn new() -> Self {
        Self {
            status: FacetStatus::Healthy,
            consecutive_failures: 0,
            recent: VecDeque::new(),
        }
    }

    fn success_rate(&self) -> f64 {
        if self.recent.is_empty() {
            return 1.0;
        }
        let successes = self.recent.iter().filter(|&&ok| ok).count();
        successes as f64 / self.recent.len() as f64
    }
}

/// Point-in-time view of one facet's health.
#[derive(Debug, Clone, Serialize)]
pub struct FacetHealthSnapshot {
    pub facet: Facet,
    pub status: FacetStatus,
    pub consecutive_failures: u32,
    pub success_rate: f64,
    pub total_attempts: usize,
}

/// Aggregated health across all provider facets.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub facets: Vec<FacetHealthSnapshot>,
    pub overall: FacetStatus,
}

/// Tracks provider call outcomes and derives per-facet statuses.
pub struct HealthTracker {
    facets: Mutex<HashMap<Facet, FacetHealth>>,
    failure_threshold: u32,
    sample_size: usize,
    min_success_rate: f64,
}

impl HealthTracker {
    /// Create a tracker that degrades a facet after `failure_threshold`
    /// consecutive failures and marks it down when the success rate over the
    /// last `sample_size` calls drops below 30%.
    pub fn new(failure_threshold: u32, sample_size: usize) -> Self {
        Self {
            facets: Mutex::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
            sample_size: sample_size.max(1),
            min_success_rate: 0.3,
        }
    }

    /// Record a successful call against a facet.
    pub fn record_success(&self, facet: Facet) {
        let mut facets = self.lock();
        let health = facets.entry(facet).or_insert_with(FacetHealth::new);

        health.consecutive_failures = 0;
        Self::push_sample(health, true, self.sample_size);

        match health.status {
            FacetStatus::Down => {
                health.status = FacetStatus::Degraded;
                debug!(facet = facet.as_str(), "facet answering again, degraded");
            }
            FacetStatus::Degraded if health.success_rate() > 0.7 => {
                health.status = FacetStatus::Healthy;
                debug!(facet = facet.as_str(), "facet recovered");
            }
            _ => {}
        }
    }

    /// Record a failed call against a facet.
    pub fn record_failure(&self, facet: Facet) {
        let mut facets = self.lock();
        let health = facets.entry(facet).or_insert_with(FacetHealth::new);

        health.consecutive_failures += 1;
        Self::push_sample(health, false, self.sample_size);

        let rate = health.success_rate();
        let saturated_window =
            health.recent.len() >= self.sample_size && rate < self.min_success_rate;

        if health.consecutive_failures >= self.failure_threshold * 2 || saturated_window {
            if health.status != FacetStatus::Down {
                warn!(
                    facet = facet.as_str(),
                    consecutive = health.consecutive_failures,
                    success_rate = rate,
                    "facet marked down"
                );
            }
            health.status = FacetStatus::Down;
        } else if health.consecutive_failures >= self.failure_threshold {
            health.status = FacetStatus::Degraded;
        }
    }

    /// Current status of one facet. Untracked facets are healthy.
    pub fn status(&self, facet: Facet) -> FacetStatus {
        self.lock()
            .get(&facet)
            .map_or(FacetStatus::Healthy, |h| h.status)
    }

    /// Snapshot every facet plus an overall status.
    pub fn report(&self) -> HealthReport {
        let facets = self.lock();
        let snapshots: Vec<FacetHealthSnapshot> = Facet::all()
            .into_iter()
            .map(|facet| match facets.get(&facet) {
                Some(health) => FacetHealthSnapshot {
                    facet,
                    status: health.status,
                    consecutive_failures: health.consecutive_failures,
                    success_rate: health.success_rate(),
                    total_attempts: health.recent.len(),
                },
                None => FacetHealthSnapshot {
                    facet,
                    status: FacetStatus::Healthy,
                    consecutive_failures: 0,
                    success_rate: 1.0,
                    total_attempts: 0,
                },
            })
            .collect();

        let overall = if snapshots.iter().all(|s| s.status == FacetStatus::Down) {
            FacetStatus::Down
        } else if snapshots.iter().all(|s| s.status == FacetStatus::Healthy) {
            FacetStatus::Healthy
        } else {
            FacetStatus::Degraded
        };

        HealthReport {
            facets: snapshots,
            overall,
        }
    }

    /// Forget all recorded outcomes.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn push_sample(health: &mut FacetHealth, success: bool, sample_size: usize) {
        health.recent.push_back(success);
        while health.recent.len() > sample_size {
            health.recent.pop_front();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Facet, FacetHealth>> {
        match self.facets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
