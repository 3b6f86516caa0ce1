//! Relationship model for versioned, linked documents.
//!
//! The [`RelationshipStore`] holds a session's documents, the [`resolver`]
//! answers version-group questions over it, [`mutation`] is the only code
//! that changes relationship fields, and the [`ChangeNotifier`] tells
//! dependent views when to re-query. [`DocumentGraph`] ties the store and the
//! notifier together.

pub mod error;
pub mod graph;
pub mod mutation;
pub mod notifier;
pub mod resolver;
pub mod store;

pub use error::GraphError;
pub use graph::DocumentGraph;
pub use mutation::{Compensation, Mutation, MutationOutcome};
pub use notifier::{ChangeEvent, ChangeKind, ChangeNotifier, ListenerId};
pub use resolver::{CurrentVersion, IntegrityWarning};
pub use store::RelationshipStore;
