// Adapters layer: concrete implementations of the domain ports.

pub mod memory_store;
pub mod policy;

pub use memory_store::InMemoryStore;
pub use policy::{AccessRule, RuleTableReviewer};
