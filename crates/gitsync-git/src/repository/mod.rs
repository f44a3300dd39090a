//! Local working copies and the references inside them.

mod refs;
mod working_copy;

pub use refs::{GitRef, parse_object_id};
pub use working_copy::WorkingCopy;
