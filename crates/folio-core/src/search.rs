//! Client-side search
//!
//! Used when the engine cannot execute text search inside a pipeline. The
//! unpaginated base result set is scanned once, in engine order, and the
//! cursor skip, pattern match and page-size cut are reproduced locally.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::warn;

use crate::pipeline::SearchPattern;
use crate::record::{Record, RecordId};

/// Compiled form of a [`SearchPattern`]
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    /// `None` only if even the escaped pattern exceeds regex size limits
    regex: Option<Regex>,
    fields: Option<Vec<String>>,
}

impl SearchMatcher {
    /// Compile a pattern.
    ///
    /// A pattern that is not a valid regular expression is matched as a
    /// literal substring instead.
    pub fn new(search: &SearchPattern) -> Self {
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(search.case_insensitive)
                .build()
        };
        let regex = build(&search.pattern)
            .or_else(|err| {
                warn!(
                    "search pattern {:?} is not a valid regex ({}), matching literally",
                    search.pattern, err
                );
                build(&regex::escape(&search.pattern))
            })
            .ok();
        Self {
            regex,
            fields: search.fields.clone(),
        }
    }

    /// Whether any searched field of `record` matches
    pub fn matches(&self, record: &Record) -> bool {
        match &self.fields {
            Some(fields) => fields
                .iter()
                .filter_map(|f| record.fields.get(f))
                .any(|v| self.value_matches(v)),
            None => record.fields.values().any(|v| self.value_matches(v)),
        }
    }

    fn value_matches(&self, value: &Value) -> bool {
        let Some(regex) = &self.regex else {
            return false;
        };
        match value {
            Value::Null => false,
            Value::String(s) => regex.is_match(s),
            Value::Bool(b) => regex.is_match(&b.to_string()),
            Value::Number(n) => regex.is_match(&n.to_string()),
            Value::Array(items) => items.iter().any(|v| self.value_matches(v)),
            Value::Object(map) => map.values().any(|v| self.value_matches(v)),
        }
    }
}

/// Page bound for a client-side scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Maximum number of matches to keep
    pub first: usize,
    /// Skip everything up to and including this record
    pub after: Option<RecordId>,
}

impl PageWindow {
    pub fn new(first: usize, after: Option<RecordId>) -> Self {
        Self { first, after }
    }
}

/// Result of a client-side scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filtered {
    pub records: Vec<Record>,
    /// False when an `after` cursor was given but never encountered
    pub cursor_found: bool,
}

enum ScanState {
    Skipping,
    Taking(usize),
}

/// Emulate cursor skip, pattern match and limit in one ordered pass.
///
/// Without a window every matching record is kept (used for counting). With
/// a window, records up to and including `after` are skipped without being
/// tested, then matches are kept until `first` of them have been collected.
pub fn filter_records(
    records: &[Record],
    matcher: &SearchMatcher,
    window: Option<&PageWindow>,
) -> Filtered {
    let limit = window.map(|w| w.first);
    let after = window.and_then(|w| w.after.as_ref());
    let mut state = match after {
        Some(_) => ScanState::Skipping,
        None => ScanState::Taking(0),
    };
    let mut kept = Vec::new();

    for record in records {
        match state {
            ScanState::Taking(seen) if Some(seen) == limit => break,
            ScanState::Skipping => {
                if Some(&record.id) == after {
                    state = ScanState::Taking(0);
                }
            }
            ScanState::Taking(seen) => {
                if matcher.matches(record) {
                    kept.push(record.clone());
                    state = ScanState::Taking(seen + 1);
                }
            }
        }
    }

    Filtered {
        records: kept,
        cursor_found: !matches!(state, ScanState::Skipping),
    }
}
