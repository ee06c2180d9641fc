//! celestial-core: an in-memory, append-only event DAG.
//!
//! Events are immutable records that name earlier events as parents. The
//! [`Store`] assigns ids, keeps parent→children and heads indices, answers
//! root and tree queries in both directions, and pushes each new event to
//! live subscribers on a best-effort basis.
//!
//! # Conventions
//!
//! - **Errors**: store operations return [`StoreError`]; config loading
//!   returns `anyhow::Result`.
//! - **Logging**: `tracing` macros only; installing a subscriber is the
//!   binary's job.

pub mod config;
pub mod dag;
pub mod error;
pub mod event;
pub mod notify;
pub mod store;

pub use config::StoreConfig;
pub use dag::{
    DescendantsTree, DescendantsTreeMeta, ParseViewError, ProvenanceTree, ProvenanceTreeMeta,
    TreeView, View,
};
pub use error::{ErrorCode, NotFoundReason, StoreError};
pub use event::{Event, EventId, NewEvent, Payload};
pub use notify::{CancelHandle, Notifier, Subscription, SubscriptionId};
pub use store::{
    DescendantsForestView, DescendantsView, ProvenanceForestView, ProvenanceView, Store,
};
