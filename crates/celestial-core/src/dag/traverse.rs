//! Descendant and provenance tree construction.
//!
//! # Algorithm
//!
//! Depth-first descent from a root, visiting the next level (children for
//! descendants, parents for provenance) in ascending id order. A visited set
//! scoped to one top-level call records every node already expanded; when
//! the walk reaches such a node again (a common descendant of two branches,
//! or a common ancestor of two parents) it emits a reference node instead of
//! expanding the same subtree a second time. Output size is therefore
//! O(reachable nodes + edges) instead of exponential in the number of
//! stacked diamonds.
//!
//! The descent keeps its frames on an explicit stack instead of recursing.
//!
//! # Forests
//!
//! Batched calls validate every root before traversing any of them, then
//! build each tree with its own fresh visited set: a node shared between two
//! roots is expanded once in each tree.

use std::collections::HashSet;

use super::ledger::Ledger;
use super::tree::{
    DescendantsTree, DescendantsTreeMeta, ProvenanceTree, ProvenanceTreeMeta, TreeNode, TreeView,
    View,
};
use crate::error::{NotFoundReason, StoreError};
use crate::event::{Event, EventId};

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Parent → child edges.
    Descendants,
    /// Child → parent edges.
    Provenance,
}

struct Frame<'a, N> {
    event: &'a Event,
    pending: std::vec::IntoIter<EventId>,
    built: Vec<N>,
}

impl Ledger {
    /// The next level below `event` in `direction`, ascending.
    ///
    /// Provenance skips parent ids that do not resolve. The append protocol
    /// never stores such an event.
    fn next_level(&self, event: &Event, direction: Direction) -> Vec<EventId> {
        match direction {
            Direction::Descendants => self.index().children_of(event.id).collect(),
            Direction::Provenance => {
                let mut parents: Vec<EventId> = event
                    .parents
                    .iter()
                    .copied()
                    .filter(|&parent| {
                        let known = self.contains(parent);
                        if !known {
                            tracing::warn!(id = event.id, parent, "skipping dangling parent");
                        }
                        known
                    })
                    .collect();
                parents.sort_unstable();
                parents
            }
        }
    }

    fn frame<'a, N>(&self, event: &'a Event, direction: Direction) -> Frame<'a, N> {
        Frame {
            event,
            pending: self.next_level(event, direction).into_iter(),
            built: Vec::new(),
        }
    }

    /// Build one tree from a root that has already been validated.
    fn build_tree<'a, N: TreeNode>(
        &'a self,
        root: &'a Event,
        direction: Direction,
        visited: &mut HashSet<EventId>,
    ) -> N {
        if !visited.insert(root.id) {
            return N::reference(root);
        }

        let mut root_frame = self.frame(root, direction);
        let mut stack: Vec<Frame<'a, N>> = Vec::new();

        loop {
            let top = stack.last_mut().unwrap_or(&mut root_frame);

            if let Some(next_id) = top.pending.next() {
                let Some(next) = self.get(next_id) else {
                    continue;
                };
                if visited.insert(next_id) {
                    stack.push(self.frame(next, direction));
                } else {
                    top.built.push(N::reference(next));
                }
                continue;
            }

            match stack.pop() {
                Some(done) => {
                    let node = N::expanded(done.event, done.built);
                    stack.last_mut().unwrap_or(&mut root_frame).built.push(node);
                }
                None => return N::expanded(root_frame.event, root_frame.built),
            }
        }
    }

    fn require_root(&self, id: EventId) -> Result<&Event, StoreError> {
        if id == 0 {
            return Err(StoreError::NotFound {
                id,
                reason: NotFoundReason::ZeroId,
            });
        }
        self.get(id).ok_or_else(|| StoreError::missing(id))
    }

    fn tree<N: TreeNode>(&self, root: EventId, direction: Direction) -> Result<N, StoreError> {
        let root = self.require_root(root)?;
        Ok(self.build_tree(root, direction, &mut HashSet::new()))
    }

    fn forest<N: TreeNode>(
        &self,
        roots: &[EventId],
        direction: Direction,
    ) -> Result<Vec<N>, StoreError> {
        let resolved = roots
            .iter()
            .map(|&id| self.require_root(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(resolved
            .into_iter()
            .map(|root| self.build_tree(root, direction, &mut HashSet::new()))
            .collect())
    }

    /// Descendants of `root` as an id-only tree.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn descendants_tree(&self, root: EventId) -> Result<DescendantsTree, StoreError> {
        self.tree(root, Direction::Descendants)
    }

    /// Descendants of `root` with event fields inlined.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn descendants_tree_meta(&self, root: EventId) -> Result<DescendantsTreeMeta, StoreError> {
        self.tree(root, Direction::Descendants)
    }

    /// Provenance of `root` as an id-only tree.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn provenance_tree(&self, root: EventId) -> Result<ProvenanceTree, StoreError> {
        self.tree(root, Direction::Provenance)
    }

    /// Provenance of `root` with event fields inlined.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn provenance_tree_meta(&self, root: EventId) -> Result<ProvenanceTreeMeta, StoreError> {
        self.tree(root, Direction::Provenance)
    }

    /// One descendants tree per root, all-or-nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] naming the first zero or unknown root.
    pub fn descendants_forest(&self, roots: &[EventId]) -> Result<Vec<DescendantsTree>, StoreError> {
        self.forest(roots, Direction::Descendants)
    }

    /// Meta-view variant of [`Ledger::descendants_forest`].
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] naming the first zero or unknown root.
    pub fn descendants_forest_meta(
        &self,
        roots: &[EventId],
    ) -> Result<Vec<DescendantsTreeMeta>, StoreError> {
        self.forest(roots, Direction::Descendants)
    }

    /// One provenance tree per root, all-or-nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] naming the first zero or unknown root.
    pub fn provenance_forest(&self, roots: &[EventId]) -> Result<Vec<ProvenanceTree>, StoreError> {
        self.forest(roots, Direction::Provenance)
    }

    /// Meta-view variant of [`Ledger::provenance_forest`].
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] naming the first zero or unknown root.
    pub fn provenance_forest_meta(
        &self,
        roots: &[EventId],
    ) -> Result<Vec<ProvenanceTreeMeta>, StoreError> {
        self.forest(roots, Direction::Provenance)
    }

    /// Descendants tree in the shape selected by `view`.
    ///
    /// # Errors
    ///
    /// Same as the struct-view call it dispatches to.
    pub fn descendants(
        &self,
        root: EventId,
        view: View,
    ) -> Result<TreeView<DescendantsTree, DescendantsTreeMeta>, StoreError> {
        match view {
            View::Struct => self.descendants_tree(root).map(TreeView::Struct),
            View::Meta => self.descendants_tree_meta(root).map(TreeView::Meta),
        }
    }

    /// Provenance tree in the shape selected by `view`.
    ///
    /// # Errors
    ///
    /// Same as the struct-view call it dispatches to.
    pub fn provenance(
        &self,
        root: EventId,
        view: View,
    ) -> Result<TreeView<ProvenanceTree, ProvenanceTreeMeta>, StoreError> {
        match view {
            View::Struct => self.provenance_tree(root).map(TreeView::Struct),
            View::Meta => self.provenance_tree_meta(root).map(TreeView::Meta),
        }
    }

    /// Descendants forest in the shape selected by `view`.
    ///
    /// # Errors
    ///
    /// Same as the struct-view call it dispatches to.
    pub fn descendants_forest_view(
        &self,
        roots: &[EventId],
        view: View,
    ) -> Result<TreeView<Vec<DescendantsTree>, Vec<DescendantsTreeMeta>>, StoreError> {
        match view {
            View::Struct => self.descendants_forest(roots).map(TreeView::Struct),
            View::Meta => self.descendants_forest_meta(roots).map(TreeView::Meta),
        }
    }

    /// Provenance forest in the shape selected by `view`.
    ///
    /// # Errors
    ///
    /// Same as the struct-view call it dispatches to.
    pub fn provenance_forest_view(
        &self,
        roots: &[EventId],
        view: View,
    ) -> Result<TreeView<Vec<ProvenanceTree>, Vec<ProvenanceTreeMeta>>, StoreError> {
        match view {
            View::Struct => self.provenance_forest(roots).map(TreeView::Struct),
            View::Meta => self.provenance_forest_meta(roots).map(TreeView::Meta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NewEvent;

    fn emit(ledger: &mut Ledger, event_type: &str, parents: &[EventId]) -> EventId {
        ledger
            .append(NewEvent::new(event_type).with_parents(parents.iter().copied()))
            .unwrap()
            .id
    }

    //    1
    //   / \
    //  2   3
    //   \ /
    //    4
    fn diamond() -> Ledger {
        let mut ledger = Ledger::new();
        emit(&mut ledger, "genesis", &[]);
        emit(&mut ledger, "left", &[1]);
        emit(&mut ledger, "right", &[1]);
        emit(&mut ledger, "merge", &[2, 3]);
        ledger
    }

    fn leaf(id: EventId) -> DescendantsTree {
        DescendantsTree {
            id,
            is_ref: false,
            children: vec![],
        }
    }

    fn desc_ref(id: EventId) -> DescendantsTree {
        DescendantsTree {
            id,
            is_ref: true,
            children: vec![],
        }
    }

    fn count_desc(node: &DescendantsTree) -> usize {
        1 + node.children.iter().map(count_desc).sum::<usize>()
    }

    #[test]
    fn descendants_of_diamond_reference_the_merge_once() {
        let tree = diamond().descendants_tree(1).unwrap();
        assert_eq!(
            tree,
            DescendantsTree {
                id: 1,
                is_ref: false,
                children: vec![
                    DescendantsTree {
                        id: 2,
                        is_ref: false,
                        children: vec![leaf(4)],
                    },
                    DescendantsTree {
                        id: 3,
                        is_ref: false,
                        children: vec![desc_ref(4)],
                    },
                ],
            }
        );
    }

    #[test]
    fn provenance_of_diamond_reference_the_root_once() {
        let tree = diamond().provenance_tree(4).unwrap();
        let root = |is_ref| ProvenanceTree {
            id: 1,
            is_ref,
            parents: vec![],
        };
        assert_eq!(
            tree,
            ProvenanceTree {
                id: 4,
                is_ref: false,
                parents: vec![
                    ProvenanceTree {
                        id: 2,
                        is_ref: false,
                        parents: vec![root(false)],
                    },
                    ProvenanceTree {
                        id: 3,
                        is_ref: false,
                        parents: vec![root(true)],
                    },
                ],
            }
        );
    }

    #[test]
    fn provenance_visits_parents_in_ascending_order() {
        let mut ledger = diamond();
        // Declared out of order on purpose.
        let id = emit(&mut ledger, "join", &[4, 2]);
        let tree = ledger.provenance_tree(id).unwrap();
        let order: Vec<EventId> = tree.parents.iter().map(|p| p.id).collect();
        assert_eq!(order, vec![2, 4]);
        // 2 expanded under the first branch, referenced under 4.
        assert!(!tree.parents[0].is_ref);
        let under_four: Vec<(EventId, bool)> = tree.parents[1]
            .parents
            .iter()
            .map(|p| (p.id, p.is_ref))
            .collect();
        assert_eq!(under_four, vec![(2, true), (3, false)]);
    }

    #[test]
    fn leaf_and_root_trees() {
        let ledger = diamond();
        assert_eq!(ledger.descendants_tree(4).unwrap(), leaf(4));
        assert_eq!(
            ledger.provenance_tree(1).unwrap(),
            ProvenanceTree {
                id: 1,
                is_ref: false,
                parents: vec![],
            }
        );
    }

    #[test]
    fn unknown_and_zero_roots_are_not_found() {
        let ledger = diamond();
        for bad in [0, 99] {
            assert!(ledger.descendants_tree(bad).unwrap_err().is_not_found());
            assert!(ledger.provenance_tree_meta(bad).unwrap_err().is_not_found());
        }
        assert_eq!(
            ledger.descendants_tree(0).unwrap_err(),
            StoreError::NotFound {
                id: 0,
                reason: NotFoundReason::ZeroId
            }
        );
    }

    #[test]
    fn meta_view_embeds_event_fields() {
        let mut ledger = Ledger::new();
        ledger
            .append_at(NewEvent::new("genesis").with_message("begin"), 10)
            .unwrap();
        ledger
            .append_at(
                NewEvent::new("step").with_parents([1]).with_payload("data"),
                20,
            )
            .unwrap();

        let tree = ledger.descendants_tree_meta(1).unwrap();
        assert_eq!(tree.event_type, "genesis");
        assert_eq!(tree.message, "begin");
        assert_eq!(tree.created_at, 10);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].event_type, "step");
        assert_eq!(tree.children[0].payload.as_bytes(), b"data");

        let prov = ledger.provenance_tree_meta(2).unwrap();
        assert_eq!(prov.parents[0].message, "begin");
    }

    #[test]
    fn forest_uses_a_fresh_visited_set_per_root() {
        let ledger = diamond();
        let forest = ledger.descendants_forest(&[2, 3]).unwrap();
        assert_eq!(forest.len(), 2);
        // 4 is reachable from both roots and expanded in each tree.
        assert_eq!(forest[0].children, vec![leaf(4)]);
        assert_eq!(forest[1].children, vec![leaf(4)]);
    }

    #[test]
    fn forest_keeps_input_order_and_duplicates() {
        let ledger = diamond();
        let ids: Vec<EventId> = ledger
            .provenance_forest(&[4, 1, 4])
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![4, 1, 4]);
    }

    #[test]
    fn forest_is_all_or_nothing() {
        let ledger = diamond();
        assert_eq!(
            ledger.descendants_forest(&[1, 42, 0]).unwrap_err(),
            StoreError::missing(42)
        );
        assert!(ledger.provenance_forest_meta(&[0, 1]).unwrap_err().is_not_found());
        assert!(ledger.descendants_forest(&[]).unwrap().is_empty());
    }

    #[test]
    fn stacked_diamonds_stay_linear() {
        // Each layer fans out to two branches that merge again. Without
        // reference nodes the tree would double in size per layer.
        let mut ledger = Ledger::new();
        let mut tip = emit(&mut ledger, "genesis", &[]);
        let layers = 24;
        for _ in 0..layers {
            let left = emit(&mut ledger, "left", &[tip]);
            let right = emit(&mut ledger, "right", &[tip]);
            tip = emit(&mut ledger, "merge", &[left, right]);
        }

        let tree = ledger.descendants_tree(1).unwrap();
        // Every event expanded once plus one reference per merge.
        assert_eq!(count_desc(&tree), ledger.len() + layers);

        let prov = ledger.provenance_tree(tip).unwrap();
        assert_eq!(prov.id, tip);
    }

    #[test]
    fn view_dispatch_matches_direct_calls() {
        let ledger = diamond();
        assert_eq!(
            ledger.descendants(1, View::Struct).unwrap(),
            TreeView::Struct(ledger.descendants_tree(1).unwrap())
        );
        assert_eq!(
            ledger.provenance(4, View::Meta).unwrap(),
            TreeView::Meta(ledger.provenance_tree_meta(4).unwrap())
        );
        assert_eq!(
            ledger.descendants_forest_view(&[2], View::Meta).unwrap(),
            TreeView::Meta(ledger.descendants_forest_meta(&[2]).unwrap())
        );
        assert!(ledger.provenance_forest_view(&[7], View::Struct).is_err());
    }

    #[test]
    fn repeated_traversals_serialize_identically() {
        let ledger = diamond();
        let a = serde_json::to_string(&ledger.descendants_tree_meta(1).unwrap()).unwrap();
        let b = serde_json::to_string(&ledger.descendants_tree_meta(1).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    fn chain(len: EventId) -> Ledger {
        let mut ledger = Ledger::new();
        emit(&mut ledger, "genesis", &[]);
        for parent in 1..len {
            emit(&mut ledger, "step", &[parent]);
        }
        ledger
    }

    #[test]
    fn long_chain_builds() {
        let ledger = chain(500);
        let tree = ledger.descendants_tree(1).unwrap();
        assert_eq!(count_desc(&tree), 500);
    }

    const DEEP: EventId = 100_000;

    #[test]
    fn deep_chain_trees_drop_without_recursing() {
        let ledger = chain(DEEP);

        let tree = ledger.descendants_tree(1).unwrap();
        let mut depth = 0;
        let mut node = &tree;
        while let Some(next) = node.children.first() {
            depth += 1;
            node = next;
        }
        assert_eq!(depth, DEEP - 1);
        drop(tree);

        drop(ledger.provenance_tree(DEEP).unwrap());
        drop(ledger.descendants_tree_meta(1).unwrap());
        drop(ledger.provenance_forest_meta(&[DEEP, DEEP / 2]).unwrap());
    }

    #[test]
    fn deep_chain_trees_serialize_without_recursing() {
        let ledger = chain(DEEP);
        let close = |key: &str| format!(r#""{key}":[]}}"#);

        let json = serde_json::to_string(&ledger.descendants_tree(1).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"id":1,"is_ref":false,"children":[{"id":2,"#));
        assert_eq!(json.matches(r#""is_ref":false"#).count(), 100_000);
        assert!(json.ends_with(&format!("{}{}", close("children"), "]}".repeat(99_999))));

        let json = serde_json::to_string(&ledger.provenance(DEEP, View::Meta).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"id":100000,"#));
        assert_eq!(json.matches(r#""type":"step""#).count(), 99_999);
        assert!(json.ends_with(&format!("{}{}", close("parents"), "]}".repeat(99_999))));
    }
}
