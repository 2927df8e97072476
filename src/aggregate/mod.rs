//! Engineering model aggregates
//!
//! The object graph the matrix reads from: things, categories, binary relationships,
//! relationship rules and the iteration that caches them.

pub mod category;
pub mod iteration;
pub mod relationship;
pub mod thing;

pub use category::*;
pub use iteration::*;
pub use relationship::*;
pub use thing::*;
