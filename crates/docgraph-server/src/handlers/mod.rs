pub mod documents;
pub mod relationships;
