//! Pagination engine
//!
//! One [`PaginationEngine`] answers one logical request: a fixed base
//! pipeline, an optional search, a page size and an optional `after` cursor.
//! It exposes four operations (total count, edges, end cursor and
//! has-next-page) that each re-derive the pipelines they need but agree with
//! one another.
//!
//! ## Memoization
//!
//! Every operation owns a single-assignment slot holding a shared future.
//! The first caller creates the computation; concurrent and later callers
//! await that same future and receive a clone of its outcome. The future
//! owns the engine state it needs, so a cancelled caller never abandons or
//! restarts the work. Failures are stored like values, so a failed slot
//! keeps reporting the same error without reissuing queries. Slots live as
//! long as the engine and are never invalidated.
//!
//! ## Execution modes
//!
//! The mode is chosen once, at construction:
//!
//! - **Native**: filtering, search, boundary and limit all run inside the
//!   query engine. Used when there is no search, or when the engine reports
//!   native search support.
//! - **Client-filtered**: the engine cannot run text search, so the
//!   unpaginated base result set is fetched once and cursor skip, pattern
//!   match and page cut are applied locally.

use std::sync::Arc;

use folio_config::{PaginationConfig, StaleCursorPolicy};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::cursor::CursorResolver;
use crate::error::{PaginationError, PaginationResult};
use crate::page::PageAssembler;
use crate::pipeline::{Filter, Pipeline, PipelineBuilder, SearchPattern, SortSpec, Stage};
use crate::record::{Record, RecordId};
use crate::search::{filter_records, PageWindow, SearchMatcher};
use crate::store::{count_from_rows, QueryEngine};

/// Page size and resume point for a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page size; the configured default applies when unset
    pub first: Option<usize>,
    /// Resume after the record with this id
    pub after: Option<RecordId>,
}

impl PaginationParams {
    pub fn first(first: usize) -> Self {
        Self {
            first: Some(first),
            after: None,
        }
    }

    #[must_use]
    pub fn after(mut self, cursor: impl Into<RecordId>) -> Self {
        self.after = Some(cursor.into());
        self
    }
}

/// Text search requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub pattern: String,
}

impl SearchSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

/// A record paired with the cursor that resumes right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub node: Record,
    pub cursor: RecordId,
}

impl From<Record> for Edge {
    fn from(node: Record) -> Self {
        let cursor = node.id.clone();
        Self { node, cursor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub end_cursor: Option<RecordId>,
    pub has_next_page: bool,
}

/// A page together with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Native,
    ClientFiltered,
}

#[derive(Debug)]
enum Strategy {
    Native,
    ClientFiltered(SearchMatcher),
}

type Computation<T> = Shared<BoxFuture<'static, PaginationResult<T>>>;

/// A single-assignment slot holding the one computation of an operation
type Slot<T> = Mutex<Option<Computation<T>>>;

#[derive(Default)]
struct Slots {
    total_count: Slot<usize>,
    scan: Slot<Arc<[Record]>>,
    edges: Slot<Arc<[Edge]>>,
    end_cursor: Slot<Option<RecordId>>,
    has_next_page: Slot<bool>,
}

impl Slots {
    /// Drop every computation; pending ones hold the engine state alive
    fn release(&self) {
        self.total_count.lock().take();
        self.scan.lock().take();
        self.edges.lock().take();
        self.end_cursor.lock().take();
        self.has_next_page.lock().take();
    }
}

/// Start the computation on first access, then hand out clones of it
///
/// The computation owns its state, so it keeps running for as long as any
/// caller awaits it; dropping the caller that started it does not restart
/// the work for the others.
fn memoized<T, F>(slot: &Slot<T>, start: F) -> Computation<T>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> BoxFuture<'static, PaginationResult<T>>,
{
    slot.lock().get_or_insert_with(|| start().shared()).clone()
}

/// Cursor pagination over one base query
pub struct PaginationEngine {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn QueryEngine>,
    base: Pipeline,
    strategy: Strategy,
    after: Option<RecordId>,
    stale_cursor: StaleCursorPolicy,
    resolver: Arc<CursorResolver>,
    assembler: PageAssembler,
    slots: Slots,
}

impl PaginationEngine {
    pub fn builder(engine: Arc<dyn QueryEngine>) -> PaginationEngineBuilder {
        PaginationEngineBuilder::new(engine)
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.inner.strategy {
            Strategy::Native => ExecutionMode::Native,
            Strategy::ClientFiltered(_) => ExecutionMode::ClientFiltered,
        }
    }

    /// The base pipeline (filters, native search and sort)
    pub fn base_pipeline(&self) -> &Pipeline {
        &self.inner.base
    }

    /// The page size, once a page fetch has fixed it
    pub fn per_page(&self) -> Option<usize> {
        self.inner.assembler.fixed_per_page()
    }

    /// Number of records the base query yields, ignoring pagination
    #[instrument(level = "debug", skip(self))]
    pub async fn total_count(&self) -> PaginationResult<usize> {
        self.inner.total_count().await
    }

    /// The records of the current page, in query order
    #[instrument(level = "debug", skip(self))]
    pub async fn edges(&self) -> PaginationResult<Arc<[Edge]>> {
        self.inner.edges().await
    }

    /// Cursor of the last edge, or `None` for an empty page
    #[instrument(level = "debug", skip(self))]
    pub async fn end_cursor(&self) -> PaginationResult<Option<RecordId>> {
        self.inner.end_cursor().await
    }

    /// Whether any record follows the current page
    ///
    /// Issues one extra bounded query using the end cursor as the boundary.
    #[instrument(level = "debug", skip(self))]
    pub async fn has_next_page(&self) -> PaginationResult<bool> {
        self.inner.has_next_page().await
    }

    pub async fn page_info(&self) -> PaginationResult<PageInfo> {
        let (end_cursor, has_next_page) =
            futures::try_join!(self.end_cursor(), self.has_next_page())?;
        Ok(PageInfo {
            end_cursor,
            has_next_page,
        })
    }

    /// Edges, page info and total count, computed concurrently
    pub async fn connection(&self) -> PaginationResult<Connection> {
        let (edges, page_info, total_count) =
            futures::try_join!(self.edges(), self.page_info(), self.total_count())?;
        Ok(Connection {
            edges: edges.to_vec(),
            page_info,
            total_count,
        })
    }
}

impl Inner {
    async fn total_count(self: &Arc<Self>) -> PaginationResult<usize> {
        let inner = Arc::clone(self);
        memoized(&self.slots.total_count, move || {
            async move { inner.compute_total_count().await }.boxed()
        })
        .await
    }

    async fn edges(self: &Arc<Self>) -> PaginationResult<Arc<[Edge]>> {
        let inner = Arc::clone(self);
        memoized(&self.slots.edges, move || {
            async move { inner.compute_edges().await }.boxed()
        })
        .await
    }

    async fn end_cursor(self: &Arc<Self>) -> PaginationResult<Option<RecordId>> {
        let inner = Arc::clone(self);
        memoized(&self.slots.end_cursor, move || {
            async move { inner.compute_end_cursor().await }.boxed()
        })
        .await
    }

    async fn has_next_page(self: &Arc<Self>) -> PaginationResult<bool> {
        let inner = Arc::clone(self);
        memoized(&self.slots.has_next_page, move || {
            async move { inner.compute_has_next_page().await }.boxed()
        })
        .await
    }

    /// The unpaginated base result set, fetched once (client-filtered mode)
    async fn scan(self: &Arc<Self>) -> PaginationResult<Arc<[Record]>> {
        let inner = Arc::clone(self);
        memoized(&self.slots.scan, move || {
            async move { inner.fetch_scan().await }.boxed()
        })
        .await
    }

    async fn execute(&self, pipeline: &Pipeline) -> PaginationResult<Vec<Record>> {
        debug!("executing [{}]", pipeline);
        let rows = self.engine.execute(pipeline).await?;
        debug!("[{}] returned {} rows", pipeline, rows.len());
        Ok(rows)
    }

    async fn fetch_scan(&self) -> PaginationResult<Arc<[Record]>> {
        trace!("initializing base scan slot");
        let rows = self.execute(&self.base).await?;
        Ok(Arc::from(rows))
    }

    async fn compute_total_count(self: &Arc<Self>) -> PaginationResult<usize> {
        trace!("initializing total count slot");
        match &self.strategy {
            Strategy::Native => {
                if let Some(after) = &self.after {
                    self.resolver.resolve(after).await?;
                }
                let pipeline = self.base.without_projection().with_stage(Stage::Count);
                let rows = self.execute(&pipeline).await?;
                Ok(count_from_rows(&rows))
            }
            Strategy::ClientFiltered(matcher) => {
                let scan = self.scan().await?;
                Ok(filter_records(&scan, matcher, None).records.len())
            }
        }
    }

    async fn compute_edges(self: &Arc<Self>) -> PaginationResult<Arc<[Edge]>> {
        trace!("initializing edges slot");
        let records = match &self.strategy {
            Strategy::Native => {
                let pipeline = self
                    .assembler
                    .assemble(&self.base, self.after.as_ref())
                    .await?;
                self.execute(&pipeline).await?
            }
            Strategy::ClientFiltered(matcher) => {
                let window = PageWindow::new(self.assembler.per_page(), self.after.clone());
                let scan = self.scan().await?;
                let filtered = filter_records(&scan, matcher, Some(&window));
                if !filtered.cursor_found {
                    self.stale_cursor_in_scan()?;
                }
                filtered.records
            }
        };
        Ok(records.into_iter().map(Edge::from).collect())
    }

    /// Apply the stale-cursor policy when `after` never appeared in the scan
    fn stale_cursor_in_scan(&self) -> PaginationResult<()> {
        let Some(after) = &self.after else {
            return Ok(());
        };
        match self.stale_cursor {
            StaleCursorPolicy::Fail => {
                warn!("cursor {} not present in search results", after);
                Err(PaginationError::CursorNotFound {
                    cursor: after.clone(),
                })
            }
            StaleCursorPolicy::EmptyPage => {
                debug!("cursor {} not present in search results, empty page", after);
                Ok(())
            }
        }
    }

    async fn compute_end_cursor(self: &Arc<Self>) -> PaginationResult<Option<RecordId>> {
        let edges = self.edges().await?;
        Ok(edges.last().map(|edge| edge.cursor.clone()))
    }

    async fn compute_has_next_page(self: &Arc<Self>) -> PaginationResult<bool> {
        trace!("initializing has-next-page slot");
        let Some(end) = self.end_cursor().await? else {
            return Ok(false);
        };
        match &self.strategy {
            Strategy::Native => {
                let pipeline = self.assembler.assemble(&self.base, Some(&end)).await?;
                Ok(!self.execute(&pipeline).await?.is_empty())
            }
            Strategy::ClientFiltered(matcher) => {
                let scan = self.scan().await?;
                let window = PageWindow::new(1, Some(end));
                Ok(!filter_records(&scan, matcher, Some(&window)).records.is_empty())
            }
        }
    }
}

impl Drop for PaginationEngine {
    fn drop(&mut self) {
        // Slot futures own an `Arc<Inner>`; break the cycle
        self.inner.slots.release();
    }
}

impl std::fmt::Debug for PaginationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationEngine")
            .field("mode", &self.mode())
            .field("base", &self.inner.base)
            .field("after", &self.inner.after)
            .field("per_page", &self.per_page())
            .finish()
    }
}

/// Collects the inputs of a [`PaginationEngine`]
pub struct PaginationEngineBuilder {
    engine: Arc<dyn QueryEngine>,
    base_stages: Vec<Stage>,
    filters: Vec<Filter>,
    sort: SortSpec,
    search: Option<SearchSpec>,
    pagination: PaginationParams,
    config: PaginationConfig,
}

impl PaginationEngineBuilder {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            base_stages: Vec::new(),
            filters: Vec::new(),
            sort: SortSpec::none(),
            search: None,
            pagination: PaginationParams::default(),
            config: PaginationConfig::default(),
        }
    }

    /// Stages that precede filters, copied from the caller
    #[must_use]
    pub fn base_stages(mut self, stages: &[Stage]) -> Self {
        self.base_stages = stages.to_vec();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn search(mut self, search: Option<SearchSpec>) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn pagination(mut self, pagination: PaginationParams) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn config(mut self, config: PaginationConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate inputs, pick the execution mode and build the base pipeline
    pub fn build(self) -> PaginationResult<PaginationEngine> {
        self.config.validate()?;
        let page_size = self.config.resolve_page_size(self.pagination.first)?;

        let pattern = self.search.map(|search| SearchPattern {
            pattern: search.pattern,
            case_insensitive: self.config.search.case_insensitive,
            fields: self.config.search.fields.clone(),
        });
        let (strategy, native_search) = match pattern {
            None => (Strategy::Native, None),
            Some(pattern) if self.engine.capabilities().native_search => {
                (Strategy::Native, Some(pattern))
            }
            Some(pattern) => (Strategy::ClientFiltered(SearchMatcher::new(&pattern)), None),
        };

        let base = PipelineBuilder::new(&self.base_stages)
            .filters(&self.filters)
            .search(native_search)
            .sort(&self.sort)
            .build();
        debug!("pagination engine: {:?} mode, base [{}]", strategy, base);

        let resolver = Arc::new(CursorResolver::new(self.engine.clone(), &base));
        let assembler = PageAssembler::new(resolver.clone(), self.sort.key().cloned(), page_size);

        Ok(PaginationEngine {
            inner: Arc::new(Inner {
                engine: self.engine,
                base,
                strategy,
                after: self.pagination.after,
                stale_cursor: self.config.stale_cursor,
                resolver,
                assembler,
                slots: Slots::default(),
            }),
        })
    }
}
