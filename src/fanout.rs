//! Concurrency-bounded fan-out over the registry.
//!
//! Entries are split into chunks of `concurrency`; chunks run strictly one
//! after another and every dispatch inside a chunk runs concurrently.  A
//! chunk only completes once all of its dispatches have settled, so at most
//! `concurrency` upstream calls are ever in flight.
//!
//! Each dispatch runs inside `catch_unwind`: a panicking provider yields the
//! error record for its entry instead of tearing down the pass.

use std::cmp::Ordering;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::join_all;
use tracing::{error, info};

use crate::dispatch::Dispatcher;
use crate::registry::{Registry, RegistryEntry};
use crate::status::fallback;
use crate::status::{Indicator, NormalizedStatus};

/// Summary of one completed pass, logged at `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub total: usize,
    /// Count per indicator, in [`Indicator::ALL`] order.
    pub counts: Vec<(Indicator, usize)>,
    pub elapsed: Duration,
}

impl FanOutReport {
    pub fn from_results(results: &[NormalizedStatus], elapsed: Duration) -> Self {
        let counts = Indicator::ALL
            .iter()
            .map(|ind| (*ind, results.iter().filter(|r| r.indicator() == *ind).count()))
            .collect();
        Self { total: results.len(), counts, elapsed }
    }

    pub fn count(&self, indicator: Indicator) -> usize {
        self.counts
            .iter()
            .find(|(ind, _)| *ind == indicator)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct FanOut {
    dispatcher: Dispatcher,
    concurrency: usize,
}

impl FanOut {
    /// `concurrency` is clamped to at least 1.
    pub fn new(dispatcher: Dispatcher, concurrency: usize) -> Self {
        Self { dispatcher, concurrency: concurrency.max(1) }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// One status per entry, sorted by name.
    pub async fn fetch_all(&self, entries: &[RegistryEntry]) -> Vec<NormalizedStatus> {
        let started = Instant::now();
        let mut results = Vec::with_capacity(entries.len());

        for chunk in entries.chunks(self.concurrency) {
            let settled = join_all(chunk.iter().map(|entry| self.dispatch_guarded(entry))).await;
            results.extend(settled);
        }

        sort_by_name(&mut results);

        let report = FanOutReport::from_results(&results, started.elapsed());
        info!(
            total = report.total,
            none = report.count(Indicator::None),
            minor = report.count(Indicator::Minor),
            major = report.count(Indicator::Major),
            critical = report.count(Indicator::Critical),
            maintenance = report.count(Indicator::Maintenance),
            external = report.count(Indicator::External),
            error = report.count(Indicator::Error),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "fan-out complete"
        );
        results
    }

    /// Single-entry variant; `None` when `name` is not in `registry`.
    pub async fn fetch_one(&self, registry: &Registry, name: &str) -> Option<NormalizedStatus> {
        let entry = registry.find(name)?;
        Some(self.dispatch_guarded(entry).await)
    }

    async fn dispatch_guarded(&self, entry: &RegistryEntry) -> NormalizedStatus {
        guard(entry, self.dispatcher.dispatch(entry)).await
    }
}

/// Run one dispatch future; a panic inside it becomes the error record for
/// `entry`.
async fn guard<F>(entry: &RegistryEntry, dispatch: F) -> NormalizedStatus
where
    F: Future<Output = NormalizedStatus>,
{
    match AssertUnwindSafe(dispatch).catch_unwind().await {
        Ok(status) => status,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());
            error!(service = %entry.name, panic = %message, "dispatch panicked, using error record");
            fallback::error_status(entry)
        }
    }
}

/// Case-insensitive name order, byte order as tiebreak.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn sort_by_name(results: &mut [NormalizedStatus]) {
    results.sort_by(|a, b| compare_names(&a.name, &b.name));
}
