mod documents;
mod relationships;

pub use documents::*;
pub use relationships::*;
