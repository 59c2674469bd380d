//! Oracle dialect: `:param{n}`-style named placeholders, no `ILIKE` (case
//! sensitivity handled by wrapping both sides in `UPPER`/`LOWER`), and
//! `OFFSET ... FETCH NEXT ... ROWS ONLY` pagination (12c+).

use crate::{require_arity, Dialect, SqlFragment};
use odata_core::Result;

pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
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

    /// Oracle has no `ILIKE`; the SQL builder wraps both operands in
    /// `UPPER()` instead and still emits a plain `LIKE`.
    fn ilike_operator(&self) -> &'static str {
        "LIKE"
    }

    fn paginate(&self, skip: u32, top: u32) -> String {
        format!("OFFSET {skip} ROWS FETCH NEXT {top} ROWS ONLY")
    }

    fn paginate_skip_only(&self, skip: u32) -> String {
        format!("OFFSET {skip} ROWS")
    }

    fn modulo(&self, a: &str, b: &str) -> String {
        format!("MOD({a}, {b})")
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
                Ok(format!("LENGTH({})", args[0]))
            }
            "indexof" => {
                require_arity(name, args, 2, 2)?;
                Ok(format!("(INSTR({}, {}) - 1)", args[0], args[1]))
            }
            "substring" => {
                require_arity(name, args, 2, 3)?;
                if args.len() == 2 {
                    Ok(format!("SUBSTR({}, {} + 1)", args[0], args[1]))
                } else {
                    Ok(format!("SUBSTR({}, {} + 1, {})", args[0], args[1], args[2]))
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
                Ok("SYSTIMESTAMP".to_string())
            }
            other => Err(odata_core::Error::build(format!(
                "function '{other}' is not supported by the oracle dialect"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_named_and_numbered() {
        assert_eq!(OracleDialect.placeholder(7), ":param7");
    }

    #[test]
    fn paginate_uses_offset_rows_fetch_next() {
        assert_eq!(OracleDialect.paginate(0, 50), "OFFSET 0 ROWS FETCH NEXT 50 ROWS ONLY");
    }

    #[test]
    fn paginate_skip_only_omits_fetch_next() {
        assert_eq!(OracleDialect.paginate_skip_only(10), "OFFSET 10 ROWS");
    }

    #[test]
    fn now_maps_to_systimestamp() {
        assert_eq!(OracleDialect.render_function("now", &[]).unwrap(), "SYSTIMESTAMP");
    }

    #[test]
    fn indexof_uses_instr() {
        let sql = OracleDialect.render_function("indexof", &["name".into(), "'a'".into()]).unwrap();
        assert_eq!(sql, "(INSTR(name, 'a') - 1)");
    }
}
