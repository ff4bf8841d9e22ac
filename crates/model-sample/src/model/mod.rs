//! Plain data shared by the sample models.

mod todo;

pub use todo::{Todo, TodoFilter};
