//! Typed values exchanged with RFC enabled functions.
//!
//! Arguments are built as an [`RfcStructure`] (parameter name to value) and
//! results come back the same way. Names are matched case-insensitively,
//! just like parameter lookup on [`RfcFunction`](crate::RfcFunction).

use crate::error::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfcValue {
    RfcString(String),
    /// An `RFC_INT` (INT1, INT2 or INT4 on the ABAP side).
    RfcInt(i32),
    RfcStructure(RfcStructure),
    /// Rows of a table parameter, in order.
    RfcTable(Vec<RfcStructure>),
}

impl RfcValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RfcValue::RfcString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[RfcStructure]> {
        match self {
            RfcValue::RfcTable(rows) => Some(rows),
            _ => None,
        }
    }
}

impl From<&str> for RfcValue {
    fn from(s: &str) -> Self {
        RfcValue::RfcString(s.to_string())
    }
}

impl From<String> for RfcValue {
    fn from(s: String) -> Self {
        RfcValue::RfcString(s)
    }
}

impl From<i32> for RfcValue {
    fn from(i: i32) -> Self {
        RfcValue::RfcInt(i)
    }
}

impl From<Vec<RfcStructure>> for RfcValue {
    fn from(rows: Vec<RfcStructure>) -> Self {
        RfcValue::RfcTable(rows)
    }
}

impl From<RfcStructure> for RfcValue {
    fn from(s: RfcStructure) -> Self {
        RfcValue::RfcStructure(s)
    }
}

/// Named values in insertion order. Setting a name that is already present
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RfcStructure {
    values: Vec<(String, RfcValue)>,
}

impl RfcStructure {
    pub fn new() -> RfcStructure {
        RfcStructure { values: Vec::new() }
    }

    /// Builder style variant of [`set`](Self::set).
    pub fn with<V: Into<RfcValue>>(mut self, name: &str, value: V) -> RfcStructure {
        self.set(name, value);
        self
    }

    pub fn set<V: Into<RfcValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self
            .values
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RfcValue> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RfcValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a string value, failing if it is missing or of another type.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(v) => v.as_str().ok_or_else(|| type_mismatch(name, "expected a string")),
            None => Err(type_mismatch(name, "missing")),
        }
    }

    /// Look up a table value, failing if it is missing or of another type.
    pub fn require_table(&self, name: &str) -> Result<&[RfcStructure]> {
        match self.get(name) {
            Some(v) => v.as_table().ok_or_else(|| type_mismatch(name, "expected a table")),
            None => Err(type_mismatch(name, "missing")),
        }
    }
}

fn type_mismatch(name: &str, reason: &str) -> Error {
    Error::TypeMismatch {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_case_insensitively() {
        let mut s = RfcStructure::new().with("QUERY_TABLE", "USR02");
        s.set("query_table", "T000");
        assert_eq!(s.len(), 1);
        assert_eq!(s.get("QUERY_TABLE"), Some(&RfcValue::from("T000")));
    }

    #[test]
    fn keeps_insertion_order() {
        let s = RfcStructure::new()
            .with("B", 1)
            .with("A", "x")
            .with("C", Vec::<RfcStructure>::new());
        let names: Vec<&str> = s.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn require_reports_wrong_type() {
        let s = RfcStructure::new().with("DATA", "not a table");
        match s.require_table("DATA") {
            Err(Error::TypeMismatch { name, .. }) => assert_eq!(name, "DATA"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.require_str("MISSING").is_err());
        assert_eq!(s.require_str("data").unwrap(), "not a table");
    }
}
