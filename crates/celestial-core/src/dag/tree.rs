//! Node shapes produced by tree traversal.
//!
//! Each traversal direction has two shapes: a **struct** view holding ids
//! only and a **meta** view that also embeds the event's own fields. A node
//! whose event was already expanded earlier in the same traversal is a
//! *reference node*: `is_ref` is set and its `children`/`parents` list is
//! empty.
//!
//! A tree is as deep as the longest path it covers. Dropping one frees it
//! level by level, and serializing one renders JSON text with an explicit
//! stack and hands it over as a `serde_json` raw value. The `Serialize`
//! impls therefore target JSON serializers.

use std::fmt;
use std::str::FromStr;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

use crate::event::{Event, EventId, Payload};

/// Forward tree of an event and everything that descends from it.
#[derive(Debug, PartialEq, Eq)]
pub struct DescendantsTree {
    pub id: EventId,
    pub is_ref: bool,
    pub children: Vec<DescendantsTree>,
}

/// [`DescendantsTree`] with each node's event fields inlined.
#[derive(Debug, PartialEq, Eq)]
pub struct DescendantsTreeMeta {
    pub id: EventId,
    pub created_at: i64,
    pub event_type: String,
    pub message: String,
    pub payload: Payload,
    pub is_ref: bool,
    pub children: Vec<DescendantsTreeMeta>,
}

/// Backward tree of an event and everything it descends from.
#[derive(Debug, PartialEq, Eq)]
pub struct ProvenanceTree {
    pub id: EventId,
    pub is_ref: bool,
    pub parents: Vec<ProvenanceTree>,
}

/// [`ProvenanceTree`] with each node's event fields inlined.
#[derive(Debug, PartialEq, Eq)]
pub struct ProvenanceTreeMeta {
    pub id: EventId,
    pub created_at: i64,
    pub event_type: String,
    pub message: String,
    pub payload: Payload,
    pub is_ref: bool,
    pub parents: Vec<ProvenanceTreeMeta>,
}

/// How a traversal materializes one node, and how the node is taken apart
/// again without recursing.
pub(crate) trait TreeNode: Sized {
    /// JSON key of the next level.
    const NEXT_KEY: &'static str;

    /// A fully expanded node whose next level is `next`.
    fn expanded(event: &Event, next: Vec<Self>) -> Self;

    /// A stand-in for a node already expanded elsewhere in the tree.
    fn reference(event: &Event) -> Self;

    fn next_level(&self) -> &[Self];

    fn next_level_mut(&mut self) -> &mut Vec<Self>;

    /// Serialize every field except the next level.
    fn head_json(&self) -> serde_json::Result<String>;
}

#[derive(Serialize)]
struct StructHead {
    id: EventId,
    is_ref: bool,
}

#[derive(Serialize)]
struct MetaHead<'a> {
    id: EventId,
    time_unix_nano: i64,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,
    #[serde(skip_serializing_if = "Payload::is_empty")]
    payload: &'a Payload,
    is_ref: bool,
}

impl TreeNode for DescendantsTree {
    const NEXT_KEY: &'static str = "children";

    fn expanded(event: &Event, next: Vec<Self>) -> Self {
        Self {
            id: event.id,
            is_ref: false,
            children: next,
        }
    }

    fn reference(event: &Event) -> Self {
        Self {
            id: event.id,
            is_ref: true,
            children: Vec::new(),
        }
    }

    fn next_level(&self) -> &[Self] {
        &self.children
    }

    fn next_level_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn head_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StructHead {
            id: self.id,
            is_ref: self.is_ref,
        })
    }
}

impl TreeNode for ProvenanceTree {
    const NEXT_KEY: &'static str = "parents";

    fn expanded(event: &Event, next: Vec<Self>) -> Self {
        Self {
            id: event.id,
            is_ref: false,
            parents: next,
        }
    }

    fn reference(event: &Event) -> Self {
        Self {
            id: event.id,
            is_ref: true,
            parents: Vec::new(),
        }
    }

    fn next_level(&self) -> &[Self] {
        &self.parents
    }

    fn next_level_mut(&mut self) -> &mut Vec<Self> {
        &mut self.parents
    }

    fn head_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StructHead {
            id: self.id,
            is_ref: self.is_ref,
        })
    }
}

impl TreeNode for DescendantsTreeMeta {
    const NEXT_KEY: &'static str = "children";

    fn expanded(event: &Event, next: Vec<Self>) -> Self {
        Self {
            id: event.id,
            created_at: event.created_at,
            event_type: event.event_type.clone(),
            message: event.message.clone(),
            payload: event.payload.clone(),
            is_ref: false,
            children: next,
        }
    }

    fn reference(event: &Event) -> Self {
        let mut node = Self::expanded(event, Vec::new());
        node.is_ref = true;
        node
    }

    fn next_level(&self) -> &[Self] {
        &self.children
    }

    fn next_level_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn head_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&MetaHead {
            id: self.id,
            time_unix_nano: self.created_at,
            event_type: &self.event_type,
            message: &self.message,
            payload: &self.payload,
            is_ref: self.is_ref,
        })
    }
}

impl TreeNode for ProvenanceTreeMeta {
    const NEXT_KEY: &'static str = "parents";

    fn expanded(event: &Event, next: Vec<Self>) -> Self {
        Self {
            id: event.id,
            created_at: event.created_at,
            event_type: event.event_type.clone(),
            message: event.message.clone(),
            payload: event.payload.clone(),
            is_ref: false,
            parents: next,
        }
    }

    fn reference(event: &Event) -> Self {
        let mut node = Self::expanded(event, Vec::new());
        node.is_ref = true;
        node
    }

    fn next_level(&self) -> &[Self] {
        &self.parents
    }

    fn next_level_mut(&mut self) -> &mut Vec<Self> {
        &mut self.parents
    }

    fn head_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&MetaHead {
            id: self.id,
            time_unix_nano: self.created_at,
            event_type: &self.event_type,
            message: &self.message,
            payload: &self.payload,
            is_ref: self.is_ref,
        })
    }
}

/// Detach the whole subtree below a node and free it level by level.
fn dismantle<N: TreeNode>(next: &mut Vec<N>) {
    let mut pending = std::mem::take(next);
    while let Some(mut node) = pending.pop() {
        pending.append(node.next_level_mut());
    }
}

/// Write `node`'s fields and open its next-level array.
fn open_node<N: TreeNode>(node: &N, out: &mut String) -> serde_json::Result<()> {
    let head = node.head_json()?;
    let fields = head
        .strip_suffix('}')
        .ok_or_else(|| serde_json::Error::custom("tree node head is not an object"))?;
    out.push_str(fields);
    out.push_str(",\"");
    out.push_str(N::NEXT_KEY);
    out.push_str("\":[");
    Ok(())
}

/// Render a whole tree as JSON text, depth-first, with an explicit stack.
fn render_json<N: TreeNode>(root: &N) -> serde_json::Result<String> {
    let mut out = String::new();
    open_node(root, &mut out)?;
    let mut levels = vec![root.next_level().iter()];

    while let Some(level) = levels.last_mut() {
        if let Some(node) = level.next() {
            if !out.ends_with('[') {
                out.push(',');
            }
            open_node(node, &mut out)?;
            levels.push(node.next_level().iter());
        } else {
            levels.pop();
            out.push_str("]}");
        }
    }
    Ok(out)
}

fn serialize_tree<N: TreeNode, S: Serializer>(root: &N, serializer: S) -> Result<S::Ok, S::Error> {
    let json = render_json(root).map_err(S::Error::custom)?;
    RawValue::from_string(json)
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

macro_rules! stack_safe_tree {
    ($($node:ty => $next:ident),+ $(,)?) => {$(
        impl Drop for $node {
            fn drop(&mut self) {
                dismantle(&mut self.$next);
            }
        }

        impl Serialize for $node {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serialize_tree(self, serializer)
            }
        }
    )+};
}

stack_safe_tree! {
    DescendantsTree => children,
    DescendantsTreeMeta => children,
    ProvenanceTree => parents,
    ProvenanceTreeMeta => parents,
}

/// Which node shape a traversal should produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum View {
    /// Ids and structure only.
    #[default]
    Struct,
    /// Ids, structure, and event fields.
    Meta,
}

impl View {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Meta => "meta",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized view name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view: {0}")]
pub struct ParseViewError(pub String);

impl FromStr for View {
    type Err = ParseViewError;

    /// Case-insensitive, ignores surrounding whitespace; empty means
    /// [`View::Struct`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "struct" => Ok(Self::Struct),
            "meta" => Ok(Self::Meta),
            _ => Err(ParseViewError(normalized)),
        }
    }
}

/// Traversal output whose shape was chosen at runtime by a [`View`].
///
/// Serializes transparently as whichever shape it holds.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeView<S, M> {
    Struct(S),
    Meta(M),
}
