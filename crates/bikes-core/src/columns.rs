//! Named, priority-ordered column candidate lists.
//!
//! Each canonical field of a traffic export is located by walking its
//! candidate list and taking the first name present in the (lower-cased)
//! input columns. The lists are plain data so they can be overridden from the
//! pipeline config file and tested on their own.

use serde::{Deserialize, Serialize};

// ── CandidateList ─────────────────────────────────────────────────────────────

/// Column names that may carry one canonical field, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(|n| n.into().to_lowercase()).collect())
    }

    /// Return the first candidate (in priority order) contained in `columns`.
    ///
    /// `columns` is expected to be lower-cased already.
    pub fn pick<'a, S: AsRef<str>>(&'a self, columns: &[S]) -> Option<&'a str> {
        self.0
            .iter()
            .find(|candidate| columns.iter().any(|c| c.as_ref() == candidate.as_str()))
            .map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

// ── ColumnCandidates ──────────────────────────────────────────────────────────

/// The full set of candidate lists used by column inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCandidates {
    pub timestamp: CandidateList,
    pub count: CandidateList,
    pub counter_id: CandidateList,
    pub counter_name: CandidateList,
    pub aadt_bike: CandidateList,
    pub aadt_car: CandidateList,
    pub aadt_total: CandidateList,
    /// Street name; the primary snapshot identifier.
    pub street_name: CandidateList,
    /// Secondary snapshot identifier (counting-station number).
    pub secondary_id: CandidateList,
    /// Free-text snapshot location description.
    pub description: CandidateList,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        Self {
            timestamp: CandidateList::new([
                "timestamp",
                "datetime",
                "time",
                "date_time",
                "dato",
                "tidspunkt",
                "date",
                "created_at",
            ]),
            count: CandidateList::new([
                "count", "counts", "value", "passes", "antal", "trafik", "bike", "cykler",
                "bicycle", "vehicle", "køretøj",
            ]),
            counter_id: CandidateList::new([
                "counter_id",
                "counterid",
                "sensor_id",
                "site_id",
                "id",
                "lokation_id",
                "location_id",
            ]),
            counter_name: CandidateList::new([
                "counter_name",
                "name",
                "sensor_name",
                "site_name",
                "lokation",
                "location",
                "sted",
                "place",
            ]),
            aadt_bike: CandidateList::new(["aadt_bike", "aadt_cykler", "bike_aadt", "cykler_aadt"]),
            aadt_car: CandidateList::new(["aadt_car", "aadt_bil", "car_aadt", "bil_aadt"]),
            aadt_total: CandidateList::new(["aadt_total", "total_aadt"]),
            street_name: CandidateList::new(["vejnavn"]),
            secondary_id: CandidateList::new(["t_nr"]),
            description: CandidateList::new(["beskrivelse"]),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_respects_priority_not_column_order() {
        let list = CandidateList::new(["timestamp", "time", "date"]);
        let columns = ["date", "time", "bike"];
        assert_eq!(list.pick(&columns), Some("time"));
    }

    #[test]
    fn test_pick_none_when_absent() {
        let list = CandidateList::new(["count", "antal"]);
        assert_eq!(list.pick(&["notes", "comment"]), None);
    }

    #[test]
    fn test_candidates_are_lowercased() {
        let list = CandidateList::new(["Counter_ID"]);
        assert_eq!(list.names(), &["counter_id".to_string()]);
        assert_eq!(list.pick(&["counter_id"]), Some("counter_id"));
    }

    #[test]
    fn test_default_lists_contain_danish_names() {
        let c = ColumnCandidates::default();
        assert_eq!(c.count.pick(&["køretøj"]), Some("køretøj"));
        assert_eq!(c.timestamp.pick(&["tidspunkt", "dato"]), Some("dato"));
        assert_eq!(c.aadt_bike.pick(&["cykler_aadt"]), Some("cykler_aadt"));
        assert_eq!(c.street_name.pick(&["vejnavn"]), Some("vejnavn"));
    }

    #[test]
    fn test_partial_override_from_json_keeps_defaults() {
        let json = r#"{ "count": ["rides", "count"] }"#;
        let c: ColumnCandidates = serde_json::from_str(json).expect("parse");
        assert_eq!(c.count.names(), &["rides".to_string(), "count".to_string()]);
        assert_eq!(c.timestamp, ColumnCandidates::default().timestamp);
    }
}
