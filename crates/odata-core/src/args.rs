use serde::{Deserialize, Serialize};

/// A bound value placed into a `NamedArgs` sink. Mirrors the declared
/// property types in `metadata::PropertyType` so a provider can bind each
/// value with the right driver-level type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Append-only, monotonically-numbered sink for parameterized SQL
/// arguments. Every value bound during query generation goes through here;
/// the query builder never interpolates a user-supplied value directly
/// into the SQL string. Placeholder numbering starts at 1 and the
/// invariant `placeholder_count == args.len()` holds for any SQL this sink
/// helped produce.
#[derive(Debug, Clone, Default)]
pub struct NamedArgs {
    values: Vec<ArgValue>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its 1-based placeholder number.
    pub fn add(&mut self, value: impl Into<ArgValue>) -> usize {
        self.values.push(value.into());
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ArgValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_numbers_are_monotonic_and_one_based() {
        let mut args = NamedArgs::new();
        assert_eq!(args.add(1i64), 1);
        assert_eq!(args.add("John".to_string()), 2);
        assert_eq!(args.add(true), 3);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn placeholder_count_matches_args_len() {
        let mut args = NamedArgs::new();
        for i in 0..5 {
            args.add(i as i64);
        }
        assert_eq!(args.len(), args.values().len());
    }
}
