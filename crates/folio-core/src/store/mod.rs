//! Query engine abstraction
//!
//! The pagination engine never talks to a database directly. It hands
//! declarative [`Pipeline`]s to a [`QueryEngine`] implementation supplied by
//! the caller, following the same dependency-inversion split as the rest of
//! the crate: core logic depends on this trait, backends implement it.
//!
//! ## Engine contract
//!
//! - Stages are applied in order.
//! - Results are returned in stream order. Without a `Sort` stage the stream
//!   is in ascending id order; a `Sort` stage orders by its field and breaks
//!   ties by ascending id.
//! - `Count` replaces the stream with one record whose [`COUNT_FIELD`] holds
//!   the number of records that reached it. An empty result means zero.
//! - `Search` stages are only sent to engines whose
//!   [`EngineCapabilities::native_search`] is true.

mod memory;

pub use memory::MemoryQueryEngine;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::pipeline::Pipeline;
use crate::record::Record;

/// Field holding the result of a `Count` stage
pub const COUNT_FIELD: &str = "count";

/// Optional features an engine can execute inside a pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// The engine evaluates `Search` stages itself
    pub native_search: bool,
}

/// Executes declarative pipelines against a document store
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run `pipeline` and return the resulting records in order
    async fn execute(&self, pipeline: &Pipeline) -> StoreResult<Vec<Record>>;

    /// What this engine can execute natively
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }
}

/// Read the number produced by a `Count` stage; no rows means zero
pub fn count_from_rows(rows: &[Record]) -> usize {
    rows.first()
        .and_then(|row| row.fields.get(COUNT_FIELD))
        .and_then(|v| v.as_u64())
        .map_or(0, |n| n as usize)
}
