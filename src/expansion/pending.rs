//! In-flight expansion bookkeeping
//!
//! One [`PendingExpansion`] exists per (session id, node path) while a fan-out
//! is outstanding. Every caller that asks for the same path while it is pending
//! attaches a oneshot receiver instead of issuing new provider calls.

use crate::error::ExplorerError;
use crate::types::{ExpandInfo, NodeExpandResponse};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::trace;

pub type ExpansionOutcome = Result<ExpandInfo, ExplorerError>;

/// Identifier of one fan-out, for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpansionId(u64);

impl ExpansionId {
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ExpansionId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Per-provider accumulator plus the callers waiting on it
#[derive(Debug)]
pub struct PendingExpansion {
    id: ExpansionId,
    refresh: bool,
    providers: Vec<String>,
    results: HashMap<String, NodeExpandResponse>,
    waiters: Vec<oneshot::Sender<ExpansionOutcome>>,
    started: DateTime<Utc>,
    started_at: Instant,
}

impl PendingExpansion {
    /// `providers` is the fan-out set in merge order
    pub fn new(providers: Vec<String>, refresh: bool) -> Self {
        Self {
            id: ExpansionId::next(),
            refresh,
            providers,
            results: HashMap::new(),
            waiters: Vec::new(),
            started: Utc::now(),
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> ExpansionId {
        self.id
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn results(&self) -> &HashMap<String, NodeExpandResponse> {
        &self.results
    }

    /// Join the request; the receiver resolves with the merged outcome
    pub fn attach(&mut self) -> oneshot::Receiver<ExpansionOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    /// Store one provider's answer; a later answer from the same provider wins
    pub fn record(&mut self, response: NodeExpandResponse) {
        if !self.providers.iter().any(|p| *p == response.provider_id) {
            trace!(
                expansion_id = self.id.as_u64(),
                provider_id = %response.provider_id,
                "Recorded response from provider outside the fan-out set"
            );
        }
        self.results.insert(response.provider_id.clone(), response);
    }

    /// Every provider in the fan-out set has answered
    pub fn is_complete(&self) -> bool {
        self.providers.iter().all(|p| self.results.contains_key(p))
    }

    /// Release every attached caller with `outcome`
    pub fn resolve(self, outcome: ExpansionOutcome) {
        let waiters = self.waiters.len();
        for tx in self.waiters {
            // The caller may have stopped waiting.
            let _ = tx.send(outcome.clone());
        }
        trace!(
            expansion_id = self.id.as_u64(),
            waiters,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "Resolved pending expansion"
        );
    }

    pub fn status(&self) -> PendingExpansionStatus {
        let mut responded: Vec<String> = self.results.keys().cloned().collect();
        responded.sort();
        PendingExpansionStatus {
            id: self.id,
            refresh: self.refresh,
            providers: self.providers.clone(),
            responded,
            waiters: self.waiters.len(),
            started: self.started,
            elapsed: self.started_at.elapsed(),
        }
    }
}

/// Snapshot of a pending expansion for diagnostics
#[derive(Debug, Clone)]
pub struct PendingExpansionStatus {
    pub id: ExpansionId,
    pub refresh: bool,
    pub providers: Vec<String>,
    pub responded: Vec<String>,
    pub waiters: usize,
    /// Wall-clock start of the fan-out
    pub started: DateTime<Utc>,
    pub elapsed: Duration,
}
