//! Core data model: values, data types, schema/group definitions, rows

pub mod data_type;
pub mod row;
pub mod schema;
pub mod value;

pub use data_type::DataType;
pub use row::{Row, RowType, RowTypeKind};
pub use schema::{Column, Group, GroupId, Schema, SchemaBuilder, Table, TableId};
pub use value::Value;
