//! Pagination configuration
//!
//! Page-size bounds, stale-cursor handling and client-side search settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Page size used when a request does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Upper bound on requested page sizes unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// How a cursor that no longer resolves to a record is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaleCursorPolicy {
    /// Fail with a cursor-not-found error in every execution mode
    #[default]
    Fail,
    /// Return an empty page when results are filtered client-side.
    ///
    /// Native execution still fails, since the cursor record must be
    /// resolved before a boundary can be built.
    EmptyPage,
}

/// Client-side search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchConfig {
    /// Match patterns without regard to case
    pub case_insensitive: bool,

    /// Restrict matching to these record fields (`None` searches every field).
    ///
    /// The record identifier is never searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            fields: None,
        }
    }
}

/// Pagination engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size used when the request leaves it unset
    pub default_page_size: usize,

    /// Largest page size a request may ask for (`None` disables the check)
    pub max_page_size: Option<usize>,

    /// Behaviour for an `after` cursor that does not resolve
    pub stale_cursor: StaleCursorPolicy,

    /// Client-side search behaviour
    pub search: SearchConfig,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: Some(DEFAULT_MAX_PAGE_SIZE),
            stale_cursor: StaleCursorPolicy::default(),
            search: SearchConfig::default(),
        }
    }
}

impl PaginationConfig {
    /// Builder-style: set the default page size
    #[must_use]
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Builder-style: set the maximum page size
    #[must_use]
    pub fn with_max_page_size(mut self, max: Option<usize>) -> Self {
        self.max_page_size = max;
        self
    }

    /// Builder-style: set the stale-cursor policy
    #[must_use]
    pub fn with_stale_cursor(mut self, policy: StaleCursorPolicy) -> Self {
        self.stale_cursor = policy;
        self
    }

    /// Builder-style: set search settings
    #[must_use]
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Check page-size bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be greater than zero".to_string(),
            ));
        }
        match self.max_page_size {
            Some(0) => Err(ConfigError::Invalid(
                "max_page_size must be greater than zero".to_string(),
            )),
            Some(max) if self.default_page_size > max => Err(ConfigError::Invalid(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, max
            ))),
            _ => Ok(()),
        }
    }

    /// Resolve the page size for a request.
    ///
    /// `None` falls back to the configured default. Zero and sizes above the
    /// configured maximum are rejected.
    pub fn resolve_page_size(&self, requested: Option<usize>) -> Result<usize, ConfigError> {
        let size = requested.unwrap_or(self.default_page_size);
        let max = self.max_page_size.unwrap_or(usize::MAX);
        if size == 0 || size > max {
            return Err(ConfigError::PageSize {
                requested: size,
                max,
            });
        }
        Ok(size)
    }

    /// JSON Schema describing this configuration
    pub fn json_schema() -> serde_json::Value {
        schemars::schema_for!(PaginationConfig).to_value()
    }
}
