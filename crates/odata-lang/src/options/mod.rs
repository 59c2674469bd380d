pub mod compute;
pub mod expand;
pub mod filter;
pub mod orderby;
pub mod search;
pub mod select;

pub use compute::{parse_compute, ComputeExpression};
pub use expand::{parse_expand, parse_expand_with_limit, ExpandOption, DEFAULT_MAX_DEPTH};
pub use filter::parse_filter;
pub use orderby::{parse_orderby, Direction, OrderKey};
pub use search::{parse_search, SearchExpression};
pub use select::parse_select;
