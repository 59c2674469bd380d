//! MySQL dialect: `:param{n}`-style named placeholders, `LIKE` is
//! case-insensitive under the default `utf8mb4_general_ci` collation (no
//! separate `ILIKE`), and `LIMIT ... OFFSET ...` pagination.

use crate::{require_arity, Dialect, SqlFragment};
use odata_core::Result;

pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":param{index}")
    }

    fn case_insensitive_like(&self) -> bool {
        true
    }

    fn ilike_operator(&self) -> &'static str {
        "LIKE"
    }

    fn paginate(&self, skip: u32, top: u32) -> String {
        format!("LIMIT {top} OFFSET {skip}")
    }

    /// MySQL has no standalone `OFFSET` clause; `LIMIT` is mandatory, so an
    /// effectively-unlimited row count is paired with the real offset.
    fn paginate_skip_only(&self, skip: u32) -> String {
        format!("LIMIT 18446744073709551615 OFFSET {skip}")
    }

    fn render_function(&self, name: &str, args: &[SqlFragment]) -> Result<SqlFragment> {
        match name.to_ascii_lowercase().as_str() {
            "tolower" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("LOWER({})", args[0]))
            }
            "toupper" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("UPPER({})", args[0]))
            }
            "trim" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("TRIM({})", args[0]))
            }
            "length" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("CHAR_LENGTH({})", args[0]))
            }
            "indexof" => {
                require_arity(name, args, 2, 2)?;
                Ok(format!("(LOCATE({}, {}) - 1)", args[1], args[0]))
            }
            "substring" => {
                require_arity(name, args, 2, 3)?;
                if args.len() == 2 {
                    Ok(format!("SUBSTRING({}, {} + 1)", args[0], args[1]))
                } else {
                    Ok(format!("SUBSTRING({}, {} + 1, {})", args[0], args[1], args[2]))
                }
            }
            "concat" => {
                require_arity(name, args, 2, 2)?;
                Ok(format!("CONCAT({}, {})", args[0], args[1]))
            }
            "year" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("YEAR({})", args[0]))
            }
            "month" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("MONTH({})", args[0]))
            }
            "day" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("DAY({})", args[0]))
            }
            "hour" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("HOUR({})", args[0]))
            }
            "minute" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("MINUTE({})", args[0]))
            }
            "second" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("SECOND({})", args[0]))
            }
            "round" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("ROUND({})", args[0]))
            }
            "floor" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("FLOOR({})", args[0]))
            }
            "ceiling" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("CEILING({})", args[0]))
            }
            "now" => {
                require_arity(name, args, 0, 0)?;
                Ok("NOW()".to_string())
            }
            other => Err(odata_core::Error::build(format!(
                "function '{other}' is not supported by the mysql dialect"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_named_and_numbered() {
        assert_eq!(MySqlDialect.placeholder(1), ":param1");
        assert_eq!(MySqlDialect.placeholder(2), ":param2");
    }

    #[test]
    fn paginate_uses_limit_offset() {
        assert_eq!(MySqlDialect.paginate(5, 20), "LIMIT 20 OFFSET 5");
    }

    #[test]
    fn paginate_skip_only_uses_unbounded_limit() {
        assert_eq!(MySqlDialect.paginate_skip_only(5), "LIMIT 18446744073709551615 OFFSET 5");
    }

    #[test]
    fn indexof_uses_locate() {
        let sql = MySqlDialect.render_function("indexof", &["name".into(), "'a'".into()]).unwrap();
        assert_eq!(sql, "(LOCATE('a', name) - 1)");
    }
}
