//! Identifier-keyed pivot of validation records.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value as Json;
use sieve_workflow::definition::Stage;

use crate::TRACING_TARGET;
use crate::config::PreviewConfig;
use crate::record::{ValidationRecord, ValueSource, is_empty_value};

/// One pivoted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    /// Identifier shared by the record's values.
    pub identifier_id: String,
    /// Cell values keyed by column.
    pub cells: BTreeMap<String, Json>,
    #[serde(skip)]
    sources: BTreeMap<String, ValueSource>,
}

impl PivotRow {
    fn new(identifier_id: &str) -> Self {
        Self {
            identifier_id: identifier_id.to_owned(),
            cells: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Returns the cell of a column.
    pub fn cell(&self, column: &str) -> Option<&Json> {
        self.cells.get(column)
    }

    /// Writes a cell unless it already holds a non-empty value from an
    /// equal or higher ranked source.
    fn fill(&mut self, column: &str, resolved: Option<(ValueSource, &Json)>) {
        let (source, value) = match resolved {
            Some((source, value)) => (Some(source), value.clone()),
            None => (None, Json::Null),
        };

        if let Some(cell) = self.cells.get(column) {
            if is_empty_value(&value) {
                return;
            }
            let current = self.sources.get(column).copied();
            if !is_empty_value(cell) && source <= current {
                return;
            }
        }

        match source {
            Some(source) if !is_empty_value(&value) => {
                self.sources.insert(column.to_owned(), source);
            }
            _ => {
                self.sources.remove(column);
            }
        }
        self.cells.insert(column.to_owned(), value);
    }
}

/// Preview table built from flat records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct PivotTable {
    /// Column order: declared columns first, then undeclared ones.
    pub columns: Vec<String>,
    /// Rows in order of first appearance.
    pub rows: Vec<PivotRow>,
    /// Number of records skipped for lacking an identifier.
    pub dropped: usize,
}

impl PivotTable {
    /// Returns the row of an identifier.
    pub fn row(&self, identifier_id: &str) -> Option<&PivotRow> {
        self.rows.iter().find(|row| row.identifier_id == identifier_id)
    }
}

/// Pivots records into one row per identifier.
///
/// For each identifier and column the value from the highest ranked source
/// wins (validated, normalized, extracted, raw); among equal sources the
/// first non-empty value wins. Columns are the declared ones present in the
/// records, in declared order, followed by undeclared columns in order of
/// first appearance. Rows past `limit` are cut after the columns are
/// computed.
pub fn build_pivot(
    records: &[ValidationRecord],
    declared_columns: &[String],
    limit: Option<usize>,
) -> PivotTable {
    let mut rows: Vec<PivotRow> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut dropped = 0;

    for record in records {
        let Some(identifier) = record.identifier_id.as_deref() else {
            dropped += 1;
            continue;
        };

        let position = *positions.entry(identifier).or_insert_with(|| {
            rows.push(PivotRow::new(identifier));
            rows.len() - 1
        });

        let column = record.column_key.as_str();
        if !seen.contains(&column) {
            seen.push(column);
        }

        rows[position].fill(column, record.resolved_value());
    }

    let present: HashSet<&str> = seen.iter().copied().collect();
    let mut columns: Vec<String> = Vec::with_capacity(seen.len());
    for column in declared_columns {
        if present.contains(column.as_str()) && !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    for column in seen {
        if !declared_columns.iter().any(|declared| declared == column) {
            columns.push(column.to_owned());
        }
    }

    if dropped > 0 {
        tracing::warn!(
            target: TRACING_TARGET,
            dropped,
            "records without an identifier were skipped"
        );
    }

    let total = rows.len();
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    tracing::debug!(
        target: TRACING_TARGET,
        records = records.len(),
        rows = total,
        shown = rows.len(),
        columns = columns.len(),
        "records pivoted"
    );

    PivotTable {
        columns,
        rows,
        dropped,
    }
}

/// Pivots records under the declared columns of a stage.
pub fn preview_stage(
    stage: &Stage,
    records: &[ValidationRecord],
    config: &PreviewConfig,
) -> PivotTable {
    build_pivot(records, &stage.declared_columns(), config.limit)
}
