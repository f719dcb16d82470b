//! Cursor resolution
//!
//! A cursor is a raw record id. Before it can bound a page, the record it
//! names has to be fetched so its sort-field value is known. Resolution runs
//! against the base pipeline, so a cursor from another dataset or one whose
//! record has since been filtered out does not resolve.
//!
//! The lookup keeps every base stage, projections included. The boundary
//! value is then read from the same shape of record the page stages compare
//! against; a sort field projected away reads as `null` on both sides and
//! pages fall back to id order.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{PaginationError, PaginationResult};
use crate::pipeline::{Condition, Pipeline, Stage};
use crate::record::{Record, RecordId, ID_FIELD};
use crate::store::QueryEngine;

type Lookup = Shared<BoxFuture<'static, PaginationResult<Record>>>;

/// Fetches cursor records, at most once per id
///
/// The first resolution of an id starts a shared lookup; every caller, then
/// or later, awaits that same lookup. It runs to completion as long as any
/// caller still awaits it, and its outcome, success or failure, is kept for
/// the lifetime of the resolver.
pub struct CursorResolver {
    engine: Arc<dyn QueryEngine>,
    base: Pipeline,
    lookups: Mutex<HashMap<RecordId, Lookup>>,
}

impl CursorResolver {
    pub fn new(engine: Arc<dyn QueryEngine>, base: &Pipeline) -> Self {
        Self {
            engine,
            base: base.clone(),
            lookups: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the record named by `id`
    ///
    /// Fails with [`PaginationError::CursorNotFound`] when no record in the
    /// base result set carries that id.
    pub async fn resolve(&self, id: &RecordId) -> PaginationResult<Record> {
        let lookup = self
            .lookups
            .lock()
            .entry(id.clone())
            .or_insert_with(|| self.start_lookup(id))
            .clone();
        lookup.await
    }

    /// The pipeline used to look up `id`
    pub fn lookup_pipeline(&self, id: &RecordId) -> Pipeline {
        self.base
            .prepended(Stage::Match(Condition::Eq(ID_FIELD.to_string(), id.to_value())))
            .with_stage(Stage::Limit(2))
    }

    fn start_lookup(&self, id: &RecordId) -> Lookup {
        let engine = Arc::clone(&self.engine);
        let pipeline = self.lookup_pipeline(id);
        let id = id.clone();
        async move { fetch(engine, pipeline, id).await }
            .boxed()
            .shared()
    }
}

async fn fetch(
    engine: Arc<dyn QueryEngine>,
    pipeline: Pipeline,
    id: RecordId,
) -> PaginationResult<Record> {
    trace!("resolving cursor {}", id);
    let rows = engine.execute(&pipeline).await?;
    if rows.len() > 1 {
        // Ids are unique per collection; a second row means the base
        // pipeline fans records out (an unwind-style stage).
        debug!("cursor {} matched {} records, using the first", id, rows.len());
    }
    rows.into_iter().next().ok_or_else(|| {
        warn!("cursor {} does not resolve to a record", id);
        PaginationError::CursorNotFound { cursor: id }
    })
}

impl std::fmt::Debug for CursorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorResolver")
            .field("base", &self.base)
            .field("resolved", &self.lookups.lock().len())
            .finish()
    }
}
