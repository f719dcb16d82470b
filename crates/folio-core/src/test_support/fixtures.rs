//! Record fixtures and assertion helpers

use crate::engine::Edge;
use crate::record::{Record, RecordId};

/// Records with ids `1..=n`, each titled `"record {id}"`
pub fn numbered(n: i64) -> Vec<Record> {
    (1..=n)
        .map(|i| Record::new(RecordId::Int(i)).with_field("title", format!("record {i}")))
        .collect()
}

/// Records built from `(id, score)` pairs
pub fn scored(pairs: &[(i64, i64)]) -> Vec<Record> {
    pairs
        .iter()
        .map(|&(id, score)| Record::new(RecordId::Int(id)).with_field("score", score))
        .collect()
}

/// Records built from `(id, title)` pairs
pub fn titled(pairs: &[(i64, &str)]) -> Vec<Record> {
    pairs
        .iter()
        .map(|&(id, title)| Record::new(RecordId::Int(id)).with_field("title", title))
        .collect()
}

pub fn int_ids(ids: impl IntoIterator<Item = i64>) -> Vec<RecordId> {
    ids.into_iter().map(RecordId::Int).collect()
}

pub fn edge_ids(edges: &[Edge]) -> Vec<RecordId> {
    edges.iter().map(|edge| edge.cursor.clone()).collect()
}

pub fn record_ids(records: &[Record]) -> Vec<RecordId> {
    records.iter().map(|record| record.id.clone()).collect()
}
