//! # Folio Core
//!
//! Cursor-based pagination over declarative document-query pipelines.
//!
//! A request is described by base stages, filters, an optional single-field
//! sort, an optional text search and pagination parameters. The
//! [`PaginationEngine`] turns those into pipelines for a pluggable
//! [`QueryEngine`] and answers four questions about the current page: how
//! many records the query yields, which records are on the page, the cursor
//! of the last one, and whether another page follows.
//!
//! ## Components
//!
//! - [`pipeline`]: stages, conditions and the base pipeline builder
//! - [`cursor`]: resolves a raw cursor id to its record
//! - [`page`]: appends the after-boundary and page limit
//! - [`search`]: client-side search for engines without native text search
//! - [`engine`]: the memoizing orchestrator
//! - [`store`]: the query engine trait and an in-memory implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use folio_core::{
//!     Filter, MemoryQueryEngine, PaginationEngine, PaginationParams, SortOrder, SortSpec,
//! };
//!
//! # async fn example(store: MemoryQueryEngine) -> Result<(), folio_core::PaginationError> {
//! let engine = PaginationEngine::builder(Arc::new(store))
//!     .filter(Filter::eq("kind", "post"))
//!     .sort(SortSpec::by("published_at", SortOrder::Descending))
//!     .pagination(PaginationParams::first(20))
//!     .build()?;
//!
//! let edges = engine.edges().await?;
//! let has_more = engine.has_next_page().await?;
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod engine;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use cursor::CursorResolver;
pub use engine::{
    Connection, Edge, ExecutionMode, PageInfo, PaginationEngine, PaginationEngineBuilder,
    PaginationParams, SearchSpec,
};
pub use error::{PaginationError, PaginationResult, StoreError, StoreResult};
pub use page::{boundary_condition, PageAssembler};
pub use pipeline::{
    Condition, Filter, FilterValue, Pipeline, PipelineBuilder, SearchPattern, SortKey, SortOrder,
    SortSpec, Stage,
};
pub use record::{Record, RecordId, ID_FIELD};
pub use search::{filter_records, Filtered, PageWindow, SearchMatcher};
pub use store::{EngineCapabilities, MemoryQueryEngine, QueryEngine, COUNT_FIELD};

// Configuration types used on the public surface
pub use folio_config::{PaginationConfig, SearchConfig, StaleCursorPolicy};
