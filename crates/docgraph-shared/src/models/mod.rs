mod document;
mod relationship;

pub use document::*;
pub use relationship::*;
