//! Page assembly
//!
//! Extends a copy of the base pipeline with an "after" boundary and a page
//! limit. The boundary admits records strictly past the cursor record on the
//! sort field, or tied with it on the sort field and carrying a greater id.
//! Since engines order ties by ascending id, consecutive pages neither repeat
//! nor skip records when sort values collide.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::cursor::CursorResolver;
use crate::error::PaginationResult;
use crate::pipeline::{Condition, Pipeline, SortKey, SortOrder, Stage};
use crate::record::{Record, RecordId, ID_FIELD};

/// Builds the boundary condition for resuming after `boundary`
pub fn boundary_condition(sort: Option<&SortKey>, boundary: &Record) -> Condition {
    let past_id = Condition::Gt(ID_FIELD.to_string(), boundary.id.to_value());
    let Some(key) = sort else {
        return past_id;
    };

    let value = boundary.get_or_null(&key.field).into_owned();
    let past_value = match key.order {
        SortOrder::Descending => Condition::Lt(key.field.clone(), value.clone()),
        SortOrder::Ascending => Condition::Gt(key.field.clone(), value.clone()),
    };
    let tied = Condition::And(vec![Condition::Eq(key.field.clone(), value), past_id]);
    Condition::Or(vec![past_value, tied])
}

/// Produces the pipelines executed for page fetches and next-page probes
#[derive(Debug)]
pub struct PageAssembler {
    resolver: Arc<CursorResolver>,
    sort: Option<SortKey>,
    requested: usize,
    per_page: OnceLock<usize>,
}

impl PageAssembler {
    /// `page_size` is the already-validated size for this request
    pub fn new(resolver: Arc<CursorResolver>, sort: Option<SortKey>, page_size: usize) -> Self {
        Self {
            resolver,
            sort,
            requested: page_size,
            per_page: OnceLock::new(),
        }
    }

    /// The page size, fixed by the first assembly
    pub fn per_page(&self) -> usize {
        *self.per_page.get_or_init(|| self.requested)
    }

    /// The page size if a page has been assembled yet
    pub fn fixed_per_page(&self) -> Option<usize> {
        self.per_page.get().copied()
    }

    /// Extend a copy of `base` with the boundary for `after` and the limit
    ///
    /// Resolving `after` fails with `CursorNotFound` when the cursor is not in
    /// the base result set.
    pub async fn assemble(
        &self,
        base: &Pipeline,
        after: Option<&RecordId>,
    ) -> PaginationResult<Pipeline> {
        let mut pipeline = base.clone();
        if let Some(after) = after {
            let boundary = self.resolver.resolve(after).await?;
            let condition = boundary_condition(self.sort.as_ref(), &boundary);
            debug!("page boundary after {}: {}", after, condition);
            pipeline.push(Stage::Match(condition));
        }
        pipeline.push(Stage::Limit(self.per_page()));
        Ok(pipeline)
    }
}
