//! `$orderby` (spec §4.4): comma-separated `property [asc|desc]`; direction
//! defaults to `asc`.

use odata_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub property: String,
    pub direction: Direction,
}

pub fn parse_orderby(raw: &str) -> Result<Vec<OrderKey>> {
    let mut keys = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Error::parse("empty clause in $orderby"));
        }
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let (property, direction) = match tokens.as_slice() {
            [property] => (*property, Direction::Asc),
            [property, dir] if dir.eq_ignore_ascii_case("asc") => (*property, Direction::Asc),
            [property, dir] if dir.eq_ignore_ascii_case("desc") => (*property, Direction::Desc),
            _ => return Err(Error::parse(format!("invalid $orderby clause: {part}"))),
        };
        keys.push(OrderKey { property: property.to_string(), direction });
    }
    if keys.is_empty() {
        return Err(Error::parse("empty $orderby"));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ascending() {
        let keys = parse_orderby("Age").unwrap();
        assert_eq!(keys[0].direction, Direction::Asc);
    }

    #[test]
    fn explicit_desc() {
        let keys = parse_orderby("Age desc").unwrap();
        assert_eq!(keys[0].direction, Direction::Desc);
    }

    #[test]
    fn multiple_keys() {
        let keys = parse_orderby("Age desc, Name asc").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].property, "Name");
    }

    #[test]
    fn invalid_direction_is_rejected() {
        assert!(parse_orderby("Age sideways").is_err());
    }
}
