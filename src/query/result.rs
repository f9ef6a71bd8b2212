//! Normalized query results and the batch view over their rows.

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;

use super::column_types::ColumnTypeDescriptor;
use crate::db::Row;

/// The adapter's output: rows, row count and column types.
///
/// Row count and column types are computed eagerly and stay available
/// after the rows have been handed off through the batch view.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    /// Normalized rows. No value is a 64-bit integer.
    #[serde(rename = "data")]
    pub rows: Vec<Row>,

    /// Declared row count if the source reported one, else `rows.len()`.
    pub row_count: usize,

    /// One descriptor per output column.
    pub column_types: Vec<ColumnTypeDescriptor>,

    /// Wall time spent fetching and post-processing.
    #[serde(skip)]
    pub execution_time: Duration,
}

impl NormalizedResult {
    /// Returns true if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Splits the result into its eager metadata and a single-pass batch view.
    pub fn into_parts(self, batch_size: usize) -> (ResultMetadata, RowBatches) {
        let metadata = ResultMetadata {
            row_count: self.row_count,
            column_types: self.column_types,
            execution_time: self.execution_time,
        };
        (metadata, RowBatches::new(self.rows, batch_size))
    }

    /// Consumes the result, yielding rows in chunks of `batch_size`.
    pub fn into_batches(self, batch_size: usize) -> RowBatches {
        RowBatches::new(self.rows, batch_size)
    }

    /// Async form of [`into_batches`](Self::into_batches).
    pub fn into_batch_stream(self, batch_size: usize) -> BoxStream<'static, Vec<Row>> {
        stream::iter(self.into_batches(batch_size)).boxed()
    }
}

/// Row count, column types and timing, detached from the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub row_count: usize,
    pub column_types: Vec<ColumnTypeDescriptor>,
    #[serde(skip)]
    pub execution_time: Duration,
}

/// A finite, exhaust-once iterator over row chunks.
#[derive(Debug)]
pub struct RowBatches {
    rows: std::vec::IntoIter<Row>,
    batch_size: usize,
}

impl RowBatches {
    /// A batch size of zero is treated as one.
    pub fn new(rows: Vec<Row>, batch_size: usize) -> Self {
        Self {
            rows: rows.into_iter(),
            batch_size: batch_size.max(1),
        }
    }

    /// Rows not yet yielded.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for RowBatches {
    type Item = Vec<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<Row> = self.rows.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let batches = self.rows.len().div_ceil(self.batch_size);
        (batches, Some(batches))
    }
}

impl ExactSizeIterator for RowBatches {}

impl std::iter::FusedIterator for RowBatches {}
