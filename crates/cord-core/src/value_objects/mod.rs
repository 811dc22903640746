//! Value objects - immutable types that represent protocol concepts

mod id;

pub use id::{Id, IdParseError};
