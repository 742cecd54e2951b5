//! The small languages inside node configs, and the operations built on them.
//!
//! This module provides:
//! - `condition`: `filter` predicates such as `age > 30`
//! - `expression`: `transform` rewrites such as `replace(value, '-', '/')`
//! - `operations`: typed operations applied to a dataset
//!
//! ## Example
//!
//! ```rust
//! use pipeline_engine::models::{Dataset, Table};
//! use pipeline_engine::spec::OpKind;
//! use pipeline_engine::transform::dsl::Operation;
//! use serde_json::json;
//!
//! let table = Table::new(
//!     vec!["name".into(), "age".into()],
//!     vec![vec!["Alice".into(), "25".into()], vec!["Bob".into(), "40".into()]],
//! );
//! let mut data = Dataset::from_table(&table);
//!
//! let op = Operation::decode(OpKind::Filter, &json!({"condition": "age > 30"}));
//! op.apply(&mut data);
//! assert_eq!(data.len(), 1);
//! ```

pub mod condition;
pub mod expression;
pub mod operations;

pub use condition::{Comparison, Condition};
pub use expression::Expression;
pub use operations::{
    is_valid_email, operations_description, parse_date, DateFormat, Operation, EMAIL_VALID_COLUMN,
};
