//! Base pipeline construction from caller criteria

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Condition, Pipeline, SearchPattern, SortKey, SortOrder, Stage};
use crate::error::{PaginationError, PaginationResult};

/// Value side of a [`Filter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Set membership
    AnyOf(Vec<Value>),
    /// Exact match
    One(Value),
}

/// Exact-match or set-membership constraint on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::One(value.into()),
        }
    }

    pub fn any_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field: field.into(),
            value: FilterValue::AnyOf(values.into_iter().map(Into::into).collect()),
        }
    }

    fn to_condition(&self) -> Condition {
        match &self.value {
            FilterValue::One(value) => Condition::Eq(self.field.clone(), value.clone()),
            FilterValue::AnyOf(values) => Condition::In(self.field.clone(), values.clone()),
        }
    }
}

/// Optional single-field sort
///
/// Field and order are given together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    key: Option<SortKey>,
}

impl SortSpec {
    /// No sort; results come back in ascending id order
    pub fn none() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            key: Some(SortKey::new(field, order)),
        }
    }

    /// Build from loosely-typed request parameters.
    ///
    /// An empty field counts as absent. Giving only one of field and order is
    /// rejected.
    pub fn from_parts(field: Option<&str>, order: Option<SortOrder>) -> PaginationResult<Self> {
        let field = field.filter(|f| !f.is_empty());
        match (field, order) {
            (Some(field), Some(order)) => Ok(Self::by(field, order)),
            (None, None) => Ok(Self::none()),
            (Some(field), None) => Err(PaginationError::InvalidSort(format!(
                "sort field '{field}' given without an order"
            ))),
            (None, Some(order)) => Err(PaginationError::InvalidSort(format!(
                "sort order {order:?} given without a field"
            ))),
        }
    }

    pub fn key(&self) -> Option<&SortKey> {
        self.key.as_ref()
    }

    pub fn is_none(&self) -> bool {
        self.key.is_none()
    }
}

/// Assembles the base pipeline for a pagination request
///
/// Caller-supplied base stages are copied, never mutated. Filters are
/// appended in input order, then the optional search stage, then the sort.
/// Pagination stages are added later, per call, on copies of the result.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    base: Vec<Stage>,
    filters: Vec<Filter>,
    search: Option<SearchPattern>,
    sort: SortSpec,
}

impl PipelineBuilder {
    pub fn new(base_stages: &[Stage]) -> Self {
        Self {
            base: base_stages.to_vec(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filters(mut self, filters: &[Filter]) -> Self {
        self.filters.extend_from_slice(filters);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a native search stage; only for engines that execute it
    #[must_use]
    pub fn search(mut self, search: Option<SearchPattern>) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: &SortSpec) -> Self {
        self.sort = sort.clone();
        self
    }

    pub fn build(self) -> Pipeline {
        let mut pipeline = Pipeline::from(self.base);
        for filter in &self.filters {
            pipeline.push(Stage::Match(filter.to_condition()));
        }
        if let Some(search) = self.search {
            pipeline.push(Stage::Search(search));
        }
        if let Some(key) = self.sort.key {
            pipeline.push(Stage::Sort(key));
        }
        pipeline
    }
}
