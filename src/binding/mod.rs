//! Bind/target expression engine: expressions, wire slots, and the
//! per-statement bind state

pub mod engine;
pub mod expression;
pub mod slots;

pub use engine::BindEngine;
pub use expression::Expr;
pub use slots::{SlotArena, SlotId, WireSlot};
