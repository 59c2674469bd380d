//! Lexing, parsing, and semantic analysis for OData v4 query options.
//!
//! The pipeline runs `url` → `options::*` (via `query::parse_query_options`)
//! → `semantic::analyze`, producing a validated [`query::QueryOptions`] ready
//! for SQL building in `odata-sql`.

pub mod kinds;
pub mod lexer;
pub mod limits;
pub mod options;
pub mod query;
pub mod semantic;
pub mod shunting;
pub mod text;
pub mod url;

pub use limits::Limits;
pub use options::{
    parse_compute, parse_expand, parse_expand_with_limit, parse_filter, parse_orderby,
    parse_search, parse_select, ComputeExpression, Direction, ExpandOption, OrderKey,
    SearchExpression,
};
pub use query::{parse_query_options, QueryOptions};
pub use semantic::analyze;
pub use shunting::parse_expression;
pub use url::{parse_raw_query, RawOptions, UrlParseCache};
