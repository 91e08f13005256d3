//! Statement execution: partition fan-out, result cursor, and the DML
//! statement object

pub mod cursor;
pub mod fanout;
pub mod statement;

pub use cursor::{Cursor, SysColumns};
pub use fanout::{partition_ranges, FanOutExecutor, HashRange};
pub use statement::DmlStatement;
