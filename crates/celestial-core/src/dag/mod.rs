//! Append-only event DAG with parent/child indices and tree traversal.
//!
//! # DAG Properties
//!
//! - **Acyclic by construction**: an event may only name parents that were
//!   appended before it, so no edge can ever close a cycle.
//! - **Append-only**: stored events never change and ids are never reused.
//! - **Derived heads**: an event is a head exactly while nothing names it as
//!   a parent.
//! - **Root events** have no parents; there may be many.
//!
//! # Sub-modules
//!
//! - [`index`]: Parent→children adjacency and the heads set.
//!   ([`GraphIndex`])
//! - [`ledger`]: Event storage, id assignment, and the append protocol.
//!   ([`Ledger`])
//! - [`tree`]: Serializable node shapes for traversal output.
//!   ([`DescendantsTree`], [`ProvenanceTreeMeta`], [`View`], ...)
//! - [`traverse`]: Descendant and provenance tree construction with
//!   shared-node deduplication. ([`Direction`])

pub mod index;
pub mod ledger;
pub mod traverse;
pub mod tree;

pub use index::GraphIndex;
pub use ledger::Ledger;
pub use traverse::Direction;
pub use tree::{
    DescendantsTree, DescendantsTreeMeta, ParseViewError, ProvenanceTree, ProvenanceTreeMeta,
    TreeView, View,
};
