//! Query model, compiler and wire types for triage.
//!
//! This crate holds everything needed to describe what an analyst is searching for and
//! to turn it into the search backend's query-string dialect:
//!
//! - **Query model**: [`QueryBuilder`] tracks the free-text query, field filters, sort,
//!   pagination, projection and the ordered group-by fields.
//! - **Compiler**: [`escape_field`], [`escape_value`], [`Filter`] clauses and
//!   [`GroupPath`] scoping produce backend-safe query strings.
//! - **Wire types**: [`SearchRequest`], [`GroupRequest`], [`SearchResponse`],
//!   [`GroupResponse`] and the typed [`Alert`] record.
//! - **Dialect parser**: [`parse`] reads the query-string dialect back into a
//!   [`QueryExpr`], which is what an in-process backend evaluates.
//!
//! # Example
//!
//! ```
//! use triage_query::{GroupPath, QueryBuilder};
//!
//! let mut query = QueryBuilder::new();
//! query.add_or_update_filter("ip_src_addr", "10.0.0.1");
//!
//! let path = GroupPath::root().child("source:type", "bro");
//! assert_eq!(
//!     path.query_for(&query.generate_select()),
//!     "source\\:type:bro AND ip_src_addr:10.0.0.1"
//! );
//! ```

#![warn(missing_docs)]

mod alert;
mod ast;
mod builder;
mod column;
mod error;
mod escape;
mod filter;
mod group_path;
mod lexer;
mod parser;
mod request;
mod response;

pub use alert::{
    ALERT_STATUS_FIELD, Alert, AlertSource, AlertStatus, FieldValue, GUID_FIELD,
    META_ALERTS_SENSOR_TYPE, SENSOR_TYPE_FIELD, WORKFLOW_ID_FIELD,
};
pub use ast::{QueryExpr, RangeExpr};
pub use builder::{ID_FIELD, QueryBuilder, THREAT_SCORE_FIELD, TIMESTAMP_FIELD, UID_FIELD};
pub use column::ColumnMetadata;
pub use error::{QueryError, SyntaxError};
pub use escape::{escape_field, escape_value};
pub use filter::{Filter, FilterValue};
pub use group_path::{GroupPath, GroupSegment};
pub use lexer::{Token, tokenize};
pub use parser::parse;
pub use request::{
    DEFAULT_INDICES, Group, GroupOrder, GroupOrderType, GroupRequest, SearchRequest, SortField,
    SortOrder,
};
pub use response::{FacetCounts, GroupResponse, GroupResult, SearchResponse};
