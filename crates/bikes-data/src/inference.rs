//! Column inference over an arbitrary traffic export.
//!
//! Every canonical field is matched against its candidate list; the first
//! candidate present wins. No type validation happens here beyond the
//! numeric-column scan used as the snapshot count of last resort.

use bikes_core::columns::{CandidateList, ColumnCandidates};
use bikes_core::error::{PipelineError, Result};
use bikes_core::models::{RawTable, SchemaKind};
use tracing::info;

// ── SnapshotCount ─────────────────────────────────────────────────────────────

/// Which column feeds the count of a snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotCount {
    AadtBike,
    AadtCar,
    AadtTotal,
    NumericFallback,
}

// ── InferredColumns ───────────────────────────────────────────────────────────

/// Matched column name per canonical field, `None` when not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredColumns {
    pub timestamp: Option<String>,
    pub count: Option<String>,
    pub counter_id: Option<String>,
    pub counter_name: Option<String>,
    pub aadt_bike: Option<String>,
    pub aadt_car: Option<String>,
    pub aadt_total: Option<String>,
    pub street_name: Option<String>,
    pub secondary_id: Option<String>,
    pub description: Option<String>,
    /// First numeric column, only scanned when no AADT column matched.
    pub numeric_fallback: Option<String>,
    /// All (lower-cased) input columns, kept for error messages.
    pub available: Vec<String>,
}

impl InferredColumns {
    /// `true` when any AADT-style column was matched.
    pub fn has_aadt(&self) -> bool {
        self.aadt_bike.is_some() || self.aadt_car.is_some() || self.aadt_total.is_some()
    }

    /// Choose the schema branch.
    ///
    /// * any AADT column → snapshot;
    /// * timestamp and count → time-series;
    /// * no timestamp, a street-name column and a numeric column → snapshot
    ///   counted from the numeric fallback;
    /// * anything else is unresolvable.
    pub fn schema(&self) -> Result<SchemaKind> {
        if self.has_aadt() {
            return Ok(SchemaKind::Snapshot);
        }
        if self.timestamp.is_some() && self.count.is_some() {
            return Ok(SchemaKind::TimeSeries);
        }
        if self.timestamp.is_none()
            && self.street_name.is_some()
            && self.numeric_fallback.is_some()
        {
            return Ok(SchemaKind::Snapshot);
        }
        Err(PipelineError::UnresolvableSchema {
            columns: self.available.clone(),
        })
    }

    /// Count column of the snapshot branch, in priority order bike, car,
    /// total, numeric fallback.
    pub fn snapshot_count(&self) -> Option<(&str, SnapshotCount)> {
        let choices = [
            (&self.aadt_bike, SnapshotCount::AadtBike),
            (&self.aadt_car, SnapshotCount::AadtCar),
            (&self.aadt_total, SnapshotCount::AadtTotal),
            (&self.numeric_fallback, SnapshotCount::NumericFallback),
        ];
        choices
            .into_iter()
            .find_map(|(col, source)| col.as_deref().map(|c| (c, source)))
    }
}

// ── infer_columns ─────────────────────────────────────────────────────────────

/// Match every canonical field of `table` against `candidates`.
pub fn infer_columns(table: &RawTable, candidates: &ColumnCandidates) -> InferredColumns {
    let cols = &table.columns;
    let pick = |list: &CandidateList| list.pick(cols.as_slice()).map(str::to_string);

    let mut inferred = InferredColumns {
        timestamp: pick(&candidates.timestamp),
        count: pick(&candidates.count),
        counter_id: pick(&candidates.counter_id),
        counter_name: pick(&candidates.counter_name),
        aadt_bike: pick(&candidates.aadt_bike),
        aadt_car: pick(&candidates.aadt_car),
        aadt_total: pick(&candidates.aadt_total),
        street_name: pick(&candidates.street_name),
        secondary_id: pick(&candidates.secondary_id),
        description: pick(&candidates.description),
        numeric_fallback: None,
        available: cols.clone(),
    };

    if !inferred.has_aadt() {
        inferred.numeric_fallback = first_numeric_column(table, &inferred);
    }

    info!(
        "Detected columns - timestamp: {:?}, count: {:?}, counter_id: {:?}, name: {:?}",
        inferred.timestamp, inferred.count, inferred.counter_id, inferred.counter_name
    );
    info!(
        "AADT columns - bike: {:?}, car: {:?}, total: {:?}",
        inferred.aadt_bike, inferred.aadt_car, inferred.aadt_total
    );

    inferred
}

/// First column, in table order, whose declared type is numeric.
///
/// Columns already matched as identifiers are skipped so a station number
/// never becomes a count.
fn first_numeric_column(table: &RawTable, inferred: &InferredColumns) -> Option<String> {
    let identifiers = [&inferred.counter_id, &inferred.secondary_id];
    table
        .columns
        .iter()
        .filter(|c| !identifiers.iter().any(|id| id.as_deref() == Some(c.as_str())))
        .find(|c| table.column_type(c).is_numeric())
        .cloned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
