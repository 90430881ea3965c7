//! In-process backend with canned results

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{Backend, BackendError, Completion, Continuation, QueryDescriptor};
use crate::value::Value;

/// Backend answering from a table of canned outcomes keyed by statement
/// text.
///
/// Completions are delivered from a spawned tokio task so callers observe
/// a real suspension; outside a runtime the continuation is completed
/// inline. Every submitted query is recorded and can be inspected with
/// [`MemoryBackend::submitted`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    responses: DashMap<String, Completion>,
    log: Mutex<Vec<QueryDescriptor>>,
    latency: Option<Duration>,
}

impl MemoryBackend {
    /// Backend with no canned outcomes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every completion by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `statement` with `value`.
    pub fn respond(&self, statement: impl Into<String>, value: Value) -> &Self {
        self.responses.insert(statement.into(), Ok(value));
        self
    }

    /// Answer `statement` with a failure.
    pub fn fail(&self, statement: impl Into<String>, error: BackendError) -> &Self {
        self.responses.insert(statement.into(), Err(error));
        self
    }

    /// Queries received so far, in submission order.
    pub fn submitted(&self) -> Vec<QueryDescriptor> {
        self.log.lock().clone()
    }

    fn outcome_for(&self, statement: &str) -> Completion {
        match self.responses.get(statement) {
            Some(entry) => entry.value().clone(),
            None => Err(BackendError::new(format!("no result for `{statement}`")).with_code("NOT_FOUND")),
        }
    }
}

impl Backend for MemoryBackend {
    fn submit(&self, query: QueryDescriptor, on_complete: Continuation) {
        debug!(statement = %query.statement, params = query.params.len(), "memory backend query");
        let outcome = self.outcome_for(&query.statement);
        self.log.lock().push(query);

        let latency = self.latency;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(delay) = latency {
                        tokio::time::sleep(delay).await;
                    }
                    on_complete.resume(outcome);
                });
            }
            Err(_) => {
                on_complete.resume(outcome);
            }
        }
    }
}
