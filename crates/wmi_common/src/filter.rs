//! In-memory record filtering.
//!
//! Filters run after the executor returns, never inside WQL. Multiple
//! filters are conjunctive and the original record order is preserved.

use crate::record::ResultRecord;

/// How a filter value is matched against a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive equality (state, start mode, drive type).
    Equals,
    /// Case-insensitive substring (name filters).
    Contains,
}

/// One field filter, built from a bound filter parameter.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
    pub mode: MatchMode,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            mode,
        }
    }

    pub fn matches(&self, record: &ResultRecord) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        let actual = actual.filter_text().to_ascii_lowercase();
        let wanted = self.value.to_ascii_lowercase();
        match self.mode {
            MatchMode::Equals => actual == wanted,
            MatchMode::Contains => actual.contains(&wanted),
        }
    }
}

/// Keep records that match every filter, preserving order.
pub fn apply_filters(records: Vec<ResultRecord>, filters: &[FieldFilter]) -> Vec<ResultRecord> {
    if filters.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| filters.iter().all(|f| f.matches(r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn service(name: &str, state: &str, start_mode: &str) -> ResultRecord {
        ResultRecord::from_pairs(vec![
            ("Name".into(), Value::Str(name.into())),
            ("State".into(), Value::Str(state.into())),
            ("StartMode".into(), Value::Str(start_mode.into())),
        ])
    }

    #[test]
    fn filters_are_conjunctive_and_order_preserving() {
        let records = vec![
            service("Spooler", "Running", "Auto"),
            service("BITS", "Stopped", "Auto"),
            service("W32Time", "Running", "Manual"),
            service("Dnscache", "Running", "Auto"),
            service("Fax", "Stopped", "Manual"),
        ];
        let filters = vec![
            FieldFilter::new("State", "Running", MatchMode::Equals),
            FieldFilter::new("StartMode", "Auto", MatchMode::Equals),
        ];
        let out = apply_filters(records, &filters);
        let names: Vec<_> = out
            .iter()
            .map(|r| r.get("Name").unwrap().display())
            .collect();
        assert_eq!(names, vec!["Spooler", "Dnscache"]);
    }

    #[test]
    fn equals_is_case_insensitive() {
        let records = vec![service("Spooler", "Running", "Auto")];
        let filters = vec![FieldFilter::new("state", "rUnNiNg", MatchMode::Equals)];
        assert_eq!(apply_filters(records, &filters).len(), 1);
    }

    #[test]
    fn contains_matches_substrings() {
        let records = vec![
            service("Spooler", "Running", "Auto"),
            service("PrintWorkflow", "Stopped", "Manual"),
        ];
        let filters = vec![FieldFilter::new("Name", "spool", MatchMode::Contains)];
        let out = apply_filters(records, &filters);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("Name").unwrap().display(), "Spooler");
    }

    #[test]
    fn missing_field_never_matches() {
        let records = vec![ResultRecord::from_pairs(vec![(
            "Other".into(),
            Value::Str("x".into()),
        )])];
        let filters = vec![FieldFilter::new("Name", "x", MatchMode::Contains)];
        assert!(apply_filters(records, &filters).is_empty());
    }
}
