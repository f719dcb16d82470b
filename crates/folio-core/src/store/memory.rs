//! In-memory query engine
//!
//! Executes every stage over a vector of records. It is the reference
//! implementation of the engine contract and doubles as a test backend:
//! it records every pipeline it runs, can inject failures, and can add
//! latency to widen race windows in concurrency tests.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{EngineCapabilities, QueryEngine, COUNT_FIELD};
use crate::error::{StoreError, StoreResult};
use crate::pipeline::{Pipeline, SortKey, Stage};
use crate::record::{compare_values, Record, RecordId};
use crate::search::SearchMatcher;

#[derive(Debug, Clone)]
enum Failure {
    Once(StoreError),
    Always(StoreError),
}

#[derive(Debug, Default)]
struct State {
    /// Kept sorted by id
    records: RwLock<Vec<Record>>,
    calls: AtomicUsize,
    executed: Mutex<Vec<Pipeline>>,
    failure: Mutex<Option<Failure>>,
}

/// Vector-backed [`QueryEngine`]
///
/// Clones share state, so a test can keep a handle for assertions while the
/// pagination engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryEngine {
    state: Arc<State>,
    capabilities: EngineCapabilities,
    latency: Option<Duration>,
}

impl MemoryQueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let engine = Self::new();
        for record in records {
            engine.insert(record);
        }
        engine
    }

    /// Builder-style: execute `Search` stages instead of rejecting them
    #[must_use]
    pub fn with_native_search(mut self) -> Self {
        self.capabilities.native_search = true;
        self
    }

    /// Builder-style: sleep before answering each pipeline
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a record
    pub fn insert(&self, record: Record) {
        let mut records = self.state.records.write();
        match records.binary_search_by(|r| r.id.cmp(&record.id)) {
            Ok(pos) => records[pos] = record,
            Err(pos) => records.insert(pos, record),
        }
    }

    pub fn len(&self) -> usize {
        self.state.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pipelines executed so far
    pub fn call_count(&self) -> usize {
        self.state.calls.load(AtomicOrdering::SeqCst)
    }

    /// Every pipeline executed so far, in call order
    pub fn executed(&self) -> Vec<Pipeline> {
        self.state.executed.lock().clone()
    }

    /// Fail the next call with `err`
    pub fn fail_next(&self, err: StoreError) {
        *self.state.failure.lock() = Some(Failure::Once(err));
    }

    /// Fail every call with `err` until cleared
    pub fn fail_always(&self, err: StoreError) {
        *self.state.failure.lock() = Some(Failure::Always(err));
    }

    pub fn clear_failure(&self) {
        *self.state.failure.lock() = None;
    }

    fn take_failure(&self) -> Option<StoreError> {
        let mut failure = self.state.failure.lock();
        match failure.take() {
            Some(Failure::Once(err)) => Some(err),
            Some(Failure::Always(err)) => {
                *failure = Some(Failure::Always(err.clone()));
                Some(err)
            }
            None => None,
        }
    }

    fn apply(&self, stage: &Stage, mut rows: Vec<Record>) -> StoreResult<Vec<Record>> {
        match stage {
            Stage::Match(condition) => rows.retain(|r| condition.matches(r)),
            Stage::Sort(key) => sort_rows(&mut rows, key),
            Stage::Search(search) => {
                if !self.capabilities.native_search {
                    return Err(StoreError::rejected("search stage is not supported"));
                }
                let matcher = SearchMatcher::new(search);
                rows.retain(|r| matcher.matches(r));
            }
            Stage::Project(fields) => {
                for row in &mut rows {
                    row.fields.retain(|name, _| fields.iter().any(|f| f == name));
                }
            }
            Stage::Limit(n) => rows.truncate(*n),
            Stage::Count => {
                let count = rows.len();
                rows = vec![Record::new(RecordId::Int(0)).with_field(COUNT_FIELD, count)];
            }
        }
        Ok(rows)
    }
}

fn sort_rows(rows: &mut [Record], key: &SortKey) {
    rows.sort_by(|a, b| {
        let by_field = compare_values(&a.get_or_null(&key.field), &b.get_or_null(&key.field));
        key.order.apply(by_field).then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl QueryEngine for MemoryQueryEngine {
    async fn execute(&self, pipeline: &Pipeline) -> StoreResult<Vec<Record>> {
        self.state.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.state.executed.lock().push(pipeline.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.take_failure() {
            debug!("memory engine failing pipeline [{}]: {}", pipeline, err);
            return Err(err);
        }

        let mut rows = self.state.records.read().clone();
        for stage in pipeline {
            rows = self.apply(stage, rows)?;
        }
        debug!("memory engine: [{}] -> {} rows", pipeline, rows.len());
        Ok(rows)
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }
}
