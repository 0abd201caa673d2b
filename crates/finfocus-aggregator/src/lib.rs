//! Aggregator (C7): applies a filter expression, groups rows by a set of
//! recognized dimensions, sums cost fields currency-safely, and normalizes
//! impact metrics to their base unit before summation (SPEC_FULL §4.7).

pub mod filter;
pub mod group;
pub mod normalize;
pub mod row;

pub use filter::{parse as parse_filter, Expr as FilterExpr, FilterError};
pub use group::{aggregate, GroupKey, GroupResult, GroupSummary};
pub use row::Row;
