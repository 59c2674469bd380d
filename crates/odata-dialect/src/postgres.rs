//! PostgreSQL dialect: `:param{n}`-style named placeholders, native
//! `ILIKE`, and `LIMIT ... OFFSET ...` pagination.

use crate::{require_arity, Dialect, SqlFragment};
use odata_core::Result;

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":param{index}")
    }

    fn case_insensitive_like(&self) -> bool {
        false
    }

    fn ilike_operator(&self) -> &'static str {
        "ILIKE"
    }

    fn paginate(&self, skip: u32, top: u32) -> String {
        format!("LIMIT {top} OFFSET {skip}")
    }

    fn paginate_skip_only(&self, skip: u32) -> String {
        format!("OFFSET {skip}")
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
                Ok(format!("(POSITION({} IN {}) - 1)", args[1], args[0]))
            }
            "substring" => {
                require_arity(name, args, 2, 3)?;
                if args.len() == 2 {
                    Ok(format!("SUBSTRING({} FROM {} + 1)", args[0], args[1]))
                } else {
                    Ok(format!("SUBSTRING({} FROM {} + 1 FOR {})", args[0], args[1], args[2]))
                }
            }
            "concat" => {
                require_arity(name, args, 2, 2)?;
                Ok(format!("({} || {})", args[0], args[1]))
            }
            "year" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(YEAR FROM {})", args[0]))
            }
            "month" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(MONTH FROM {})", args[0]))
            }
            "day" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(DAY FROM {})", args[0]))
            }
            "hour" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(HOUR FROM {})", args[0]))
            }
            "minute" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(MINUTE FROM {})", args[0]))
            }
            "second" => {
                require_arity(name, args, 1, 1)?;
                Ok(format!("EXTRACT(SECOND FROM {})", args[0]))
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
                Ok(format!("CEIL({})", args[0]))
            }
            "now" => {
                require_arity(name, args, 0, 0)?;
                Ok("NOW()".to_string())
            }
            other => Err(odata_core::Error::build(format!(
                "function '{other}' is not supported by the postgres dialect"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_named_and_numbered() {
        assert_eq!(PostgresDialect.placeholder(3), ":param3");
    }

    #[test]
    fn paginate_uses_limit_offset() {
        assert_eq!(PostgresDialect.paginate(10, 25), "LIMIT 25 OFFSET 10");
    }

    #[test]
    fn paginate_skip_only_omits_limit() {
        assert_eq!(PostgresDialect.paginate_skip_only(10), "OFFSET 10");
    }

    #[test]
    fn contains_function_is_rejected_unknown_here() {
        // contains/startswith/endswith are translated by the SQL builder via
        // ILIKE, not through render_function.
        assert!(PostgresDialect.render_function("contains", &["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn year_uses_extract() {
        let sql = PostgresDialect.render_function("year", &["created_at".into()]).unwrap();
        assert_eq!(sql, "EXTRACT(YEAR FROM created_at)");
    }
}
