//! Value and type model shared by the binding, wire, and decode layers

pub mod data_type;
pub mod value;

pub use data_type::DataType;
pub use value::{Row, Value};
