//! Declarative query pipelines
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s handed to a
//! [`QueryEngine`](crate::store::QueryEngine). Pipelines are values: the base
//! pipeline of a pagination request is built once, and every call that needs
//! boundary or limit stages extends a copy of it.

mod builder;
mod stage;

pub use builder::{Filter, FilterValue, PipelineBuilder, SortSpec};
pub use stage::{Condition, SearchPattern, SortKey, SortOrder, Stage};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered sequence of query stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    pub(crate) fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// A copy of this pipeline with `stage` appended
    #[must_use]
    pub fn with_stage(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.push(stage);
        next
    }

    /// A copy of this pipeline with `stages` appended
    #[must_use]
    pub fn extended(&self, stages: impl IntoIterator<Item = Stage>) -> Self {
        let mut next = self.clone();
        next.stages.extend(stages);
        next
    }

    /// A copy of this pipeline with `stage` placed first
    #[must_use]
    pub fn prepended(&self, stage: Stage) -> Self {
        let mut stages = Vec::with_capacity(self.stages.len() + 1);
        stages.push(stage);
        stages.extend(self.stages.iter().cloned());
        Self { stages }
    }

    /// A copy of this pipeline without projection stages
    #[must_use]
    pub fn without_projection(&self) -> Self {
        Self {
            stages: self
                .stages
                .iter()
                .filter(|s| !s.is_projection())
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stages.is_empty() {
            return f.write_str("[]");
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
