//! `$select` (spec §4.4): comma-separated identifiers, ordered and
//! de-duplicated.

use odata_core::{Error, Result};

pub fn parse_select(raw: &str) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for part in raw.split(',') {
        let name = part.trim();
        if name.is_empty() {
            return Err(Error::parse("empty property name in $select"));
        }
        let key = name.to_ascii_lowercase();
        if seen.insert(key) {
            result.push(name.to_string());
        }
    }
    if result.is_empty() {
        return Err(Error::parse("empty $select"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_and_dedupes() {
        let select = parse_select("Name,Age,Name").unwrap();
        assert_eq!(select, vec!["Name", "Age"]);
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(parse_select("Name,,Age").is_err());
    }
}
