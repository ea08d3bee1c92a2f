// §4.A Pane Tree: the pure data model. Every operation here is a function on
// the tree (or an in-place mutation with equivalent semantics); nothing in
// this file touches GTK or WebKit.

use std::fmt;

use ahash::AHashMap;

use crate::com::{Direction, NodeId, Orientation, PaneId};

#[derive(Debug, Clone)]
pub struct Leaf {
    pub pane: PaneId,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub enum PaneNode {
    Leaf(Leaf),
    Split { node: NodeId, orientation: Orientation, ratio: f64, left: Box<PaneNode>, right: Box<PaneNode> },
    Stack { node: NodeId, children: Vec<Leaf>, active_index: usize },
}

impl PaneNode {
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Leaf(l) => l.node,
            Self::Split { node, .. } | Self::Stack { node, .. } => *node,
        }
    }

    fn new_leaf(pane: PaneId) -> Self {
        Self::Leaf(Leaf { pane, node: NodeId::next() })
    }
}

impl fmt::Display for PaneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(l) => write!(f, "{}", l.pane),
            Self::Split { orientation, left, right, ratio, .. } => {
                write!(f, "Split({orientation:?}, {ratio:.2}, {left}, {right})")
            }
            Self::Stack { children, active_index, .. } => {
                write!(f, "Stack[")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if i == *active_index {
                        write!(f, "*")?;
                    }
                    write!(f, "{}", c.pane)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug)]
pub enum TreeError {
    LeafNotFound(PaneId),
    LastLeaf,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeafNotFound(id) => write!(f, "pane {id} not found in tree"),
            Self::LastLeaf => write!(f, "cannot close the last remaining leaf"),
        }
    }
}

// What replaced the closed leaf's position, for the Focus Manager (§4.D
// rule 2) to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    PromotedSibling(PaneId),
    StackShrunk { active: PaneId },
    StackDegenerated(PaneId),
}

// Node-id-level detail of a `close`, alongside `CloseOutcome`'s pane-level
// view, so the Widget Mirror can re-home the right GTK container without
// the Focus Manager's API having to carry ids it doesn't care about.
#[derive(Debug, Clone, Copy)]
pub enum MirrorCloseInfo {
    Promoted { removed_container: NodeId, promoted_node: NodeId },
    StackShrunk { stack_node: NodeId, active_node: NodeId },
    StackDegenerated { removed_container: NodeId, remaining_node: NodeId },
}

// Node-id-level detail of a `split`, consumed by the Widget Mirror to wrap
// the pre-existing leaf's widget and the freshly provisioned one in a new
// `gtk::Paned`. `replaced_container` is set only when the split pulled a
// leaf out of a stack, a case the mirror does not yet fully re-render (see
// the grounding ledger).
#[derive(Debug, Clone, Copy)]
pub struct SplitOutcome {
    pub split_node: NodeId,
    pub orientation: Orientation,
    pub ratio: f64,
    pub left: NodeId,
    pub right: NodeId,
    pub new_leaf_node: NodeId,
    pub replaced_container: Option<NodeId>,
}

// Node-id-level detail of a `stack`.
#[derive(Debug, Clone, Copy)]
pub enum StackOutcome {
    Fresh { stack_node: NodeId, existing_leaf: NodeId, new_leaf: NodeId },
    MemberAdded { stack_node: NodeId, new_leaf: NodeId },
}

pub struct PaneTree {
    root: PaneNode,
    // Repaired on every structural mutation, as spec §4.A requires.
    index: AHashMap<PaneId, NodeId>,
}

impl PaneTree {
    pub fn new(first_pane: PaneId) -> Self {
        let root = PaneNode::new_leaf(first_pane);
        let mut tree = Self { root, index: AHashMap::new() };
        tree.reindex();
        tree
    }

    pub fn root(&self) -> &PaneNode {
        &self.root
    }

    fn reindex(&mut self) {
        self.index.clear();
        Self::collect_index(&self.root, &mut self.index);
    }

    fn collect_index(node: &PaneNode, index: &mut AHashMap<PaneId, NodeId>) {
        match node {
            PaneNode::Leaf(l) => {
                index.insert(l.pane, l.node);
            }
            PaneNode::Split { left, right, .. } => {
                Self::collect_index(left, index);
                Self::collect_index(right, index);
            }
            PaneNode::Stack { children, .. } => {
                for c in children {
                    index.insert(c.pane, c.node);
                }
            }
        }
    }

    pub fn find_leaf(&self, pane: PaneId) -> Option<NodeId> {
        self.index.get(&pane).copied()
    }

    pub fn contains(&self, pane: PaneId) -> bool {
        self.index.contains_key(&pane)
    }

    pub fn leaf_count(&self) -> usize {
        self.index.len()
    }

    // All panes, in left-to-right/top-to-bottom tree order, for teardown and
    // iteration purposes.
    pub fn leaves(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        Self::collect_leaves(&self.root, &mut out);
        out
    }

    fn collect_leaves(node: &PaneNode, out: &mut Vec<PaneId>) {
        match node {
            PaneNode::Leaf(l) => out.push(l.pane),
            PaneNode::Split { left, right, .. } => {
                Self::collect_leaves(left, out);
                Self::collect_leaves(right, out);
            }
            PaneNode::Stack { children, .. } => out.extend(children.iter().map(|c| c.pane)),
        }
    }

    /// §4.A `split`: inserts `new_pane` as a sibling of `target`.
    pub fn split(
        &mut self,
        target: PaneId,
        direction: Direction,
        new_pane: PaneId,
    ) -> Result<SplitOutcome, TreeError> {
        if !self.contains(target) {
            return Err(TreeError::LeafNotFound(target));
        }

        let outcome = Self::split_at(&mut self.root, target, direction, new_pane)
            .expect("presence checked above");
        self.reindex();
        Ok(outcome)
    }

    fn split_at(
        node: &mut PaneNode,
        target: PaneId,
        direction: Direction,
        new_pane: PaneId,
    ) -> Option<SplitOutcome> {
        match node {
            PaneNode::Leaf(l) if l.pane == target => {
                let orientation = direction.axis();
                let existing = PaneNode::Leaf(l.clone());
                let new_leaf = PaneNode::new_leaf(new_pane);
                let new_leaf_node = new_leaf.node_id();
                let (left, right) = match direction {
                    crate::com::Direction::Left | crate::com::Direction::Up => (new_leaf, existing),
                    crate::com::Direction::Right | crate::com::Direction::Down => (existing, new_leaf),
                };
                let split_node = NodeId::next();
                let (left_node, right_node) = (left.node_id(), right.node_id());
                *node = PaneNode::Split {
                    node: split_node,
                    orientation,
                    ratio: 0.5,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                Some(SplitOutcome {
                    split_node,
                    orientation,
                    ratio: 0.5,
                    left: left_node,
                    right: right_node,
                    new_leaf_node,
                    replaced_container: None,
                })
            }
            PaneNode::Leaf(_) => None,
            PaneNode::Split { left, right, .. } => {
                Self::split_at(left, target, direction, new_pane)
                    .or_else(|| Self::split_at(right, target, direction, new_pane))
            }
            PaneNode::Stack { node: stack_id, children, active_index } => {
                if let Some(pos) = children.iter().position(|c| c.pane == target) {
                    // A leaf inside a stack is split by pulling it out into
                    // its own split, keeping the rest of the stack as the
                    // sibling -- degenerate case of exactly one remaining
                    // stack member collapses the stack. The Widget Mirror
                    // does not fully re-render this case today (see the
                    // grounding ledger); the data model stays correct
                    // regardless.
                    let removed_container = *stack_id;
                    let leaf = children.remove(pos);
                    let sibling = if children.len() == 1 {
                        PaneNode::Leaf(children.remove(0))
                    } else {
                        let new_active = (*active_index).min(children.len() - 1);
                        PaneNode::Stack {
                            node: NodeId::next(),
                            children: std::mem::take(children),
                            active_index: new_active,
                        }
                    };
                    let orientation = direction.axis();
                    let new_leaf = PaneNode::new_leaf(new_pane);
                    let new_leaf_node = new_leaf.node_id();
                    let existing = PaneNode::Leaf(leaf);
                    let (inner_left, inner_right) = match direction {
                        crate::com::Direction::Left | crate::com::Direction::Up => (new_leaf, existing),
                        crate::com::Direction::Right | crate::com::Direction::Down => (existing, new_leaf),
                    };
                    let split_node = NodeId::next();
                    let (left_node, right_node) = (inner_left.node_id(), inner_right.node_id());
                    let inner = PaneNode::Split {
                        node: split_node,
                        orientation,
                        ratio: 0.5,
                        left: Box::new(inner_left),
                        right: Box::new(inner_right),
                    };
                    // The stack's old slot is replaced by a split between
                    // the pulled-out leaf's own new split and whatever was
                    // left of the stack -- keeps every pane in the tree even
                    // though the Widget Mirror only re-renders the inner
                    // split today (see the grounding ledger).
                    *node = PaneNode::Split {
                        node: NodeId::next(),
                        orientation,
                        ratio: 0.5,
                        left: Box::new(inner),
                        right: Box::new(sibling),
                    };
                    Some(SplitOutcome {
                        split_node,
                        orientation,
                        ratio: 0.5,
                        left: left_node,
                        right: right_node,
                        new_leaf_node,
                        replaced_container: Some(removed_container),
                    })
                } else {
                    None
                }
            }
        }
    }

    /// §4.A `stack`: groups `new_pane` with `target`.
    pub fn stack(&mut self, target: PaneId, new_pane: PaneId) -> Result<StackOutcome, TreeError> {
        if !self.contains(target) {
            return Err(TreeError::LeafNotFound(target));
        }
        let outcome = Self::stack_at(&mut self.root, target, new_pane).expect("presence checked above");
        self.reindex();
        Ok(outcome)
    }

    fn stack_at(node: &mut PaneNode, target: PaneId, new_pane: PaneId) -> Option<StackOutcome> {
        match node {
            PaneNode::Leaf(l) if l.pane == target => {
                let existing = l.clone();
                let stack_node = NodeId::next();
                let new_leaf = Leaf { pane: new_pane, node: NodeId::next() };
                let new_leaf_node = new_leaf.node;
                let existing_node = existing.node;
                *node = PaneNode::Stack { node: stack_node, children: vec![existing, new_leaf], active_index: 1 };
                Some(StackOutcome::Fresh { stack_node, existing_leaf: existing_node, new_leaf: new_leaf_node })
            }
            PaneNode::Leaf(_) => None,
            PaneNode::Split { left, right, .. } => {
                Self::stack_at(left, target, new_pane).or_else(|| Self::stack_at(right, target, new_pane))
            }
            PaneNode::Stack { node: stack_id, children, active_index } => {
                if let Some(pos) = children.iter().position(|c| c.pane == target) {
                    let new_leaf = Leaf { pane: new_pane, node: NodeId::next() };
                    let new_leaf_node = new_leaf.node;
                    children.insert(pos + 1, new_leaf);
                    *active_index = pos + 1;
                    Some(StackOutcome::MemberAdded { stack_node: *stack_id, new_leaf: new_leaf_node })
                } else {
                    None
                }
            }
        }
    }

    /// §4.A `close`: removes `target`, applying promotion/degeneration.
    pub fn close(&mut self, target: PaneId) -> Result<(CloseOutcome, MirrorCloseInfo), TreeError> {
        if self.leaf_count() <= 1 {
            return Err(TreeError::LastLeaf);
        }
        if !self.contains(target) {
            return Err(TreeError::LeafNotFound(target));
        }

        let outcome = Self::close_at(&mut self.root, target).expect("presence checked above");
        self.reindex();
        Ok(outcome)
    }

    fn close_at(node: &mut PaneNode, target: PaneId) -> Option<(CloseOutcome, MirrorCloseInfo)> {
        match node {
            PaneNode::Leaf(_) => None,
            PaneNode::Split { node: split_id, left, right, .. } => {
                let removed_container = *split_id;
                if matches!(left.as_ref(), PaneNode::Leaf(l) if l.pane == target) {
                    let surviving = *right.clone();
                    let sibling_leaf = Self::any_leaf(&surviving);
                    let promoted_node = surviving.node_id();
                    *node = surviving;
                    return Some((
                        CloseOutcome::PromotedSibling(sibling_leaf),
                        MirrorCloseInfo::Promoted { removed_container, promoted_node },
                    ));
                }
                if matches!(right.as_ref(), PaneNode::Leaf(l) if l.pane == target) {
                    let surviving = *left.clone();
                    let sibling_leaf = Self::any_leaf(&surviving);
                    let promoted_node = surviving.node_id();
                    *node = surviving;
                    return Some((
                        CloseOutcome::PromotedSibling(sibling_leaf),
                        MirrorCloseInfo::Promoted { removed_container, promoted_node },
                    ));
                }
                if let Some(outcome) = Self::close_at(left, target) {
                    return Some(outcome);
                }
                Self::close_at(right, target)
            }
            PaneNode::Stack { node: stack_id, children, active_index } => {
                let pos = children.iter().position(|c| c.pane == target)?;
                let removed_container = *stack_id;
                children.remove(pos);
                if children.len() == 1 {
                    let remaining_leaf = children.remove(0);
                    let remaining_node = remaining_leaf.node;
                    let remaining_pane = remaining_leaf.pane;
                    *node = PaneNode::Leaf(remaining_leaf);
                    return Some((
                        CloseOutcome::StackDegenerated(remaining_pane),
                        MirrorCloseInfo::StackDegenerated { removed_container, remaining_node },
                    ));
                }
                *active_index = (*active_index).min(children.len() - 1);
                let active = children[*active_index].clone();
                Some((
                    CloseOutcome::StackShrunk { active: active.pane },
                    MirrorCloseInfo::StackShrunk { stack_node: removed_container, active_node: active.node },
                ))
            }
        }
    }

    fn any_leaf(node: &PaneNode) -> PaneId {
        match node {
            PaneNode::Leaf(l) => l.pane,
            PaneNode::Split { left, .. } => Self::any_leaf(left),
            PaneNode::Stack { children, active_index, .. } => children[*active_index].pane,
        }
    }

    /// §4.A `neighbor`: geometric navigation.
    pub fn neighbor(&self, from: PaneId, direction: Direction) -> Option<PaneId> {
        let path = Self::path_to(&self.root, from, Vec::new())?;

        // Inside a stack, up/down move the active index instead of leaving.
        if let Some(PaneNode::Stack { children, active_index, .. }) = path.last().copied() {
            if matches!(direction, Direction::Up | Direction::Down) {
                let len = children.len();
                let delta: i64 = if direction == Direction::Down { 1 } else { -1 };
                let new_index = (*active_index as i64 + delta).rem_euclid(len as i64) as usize;
                return Some(children[new_index].pane);
            }
        }

        // Walk up to the lowest ancestor whose axis matches and where we're
        // on the "wrong" side, then descend into the sibling subtree.
        let axis = direction.axis();
        for window in (0..path.len()).rev() {
            if let PaneNode::Split { orientation, left, right, .. } = path[window] {
                if *orientation != axis {
                    continue;
                }
                let on_left = Self::contains_leaf(left, from);
                let wrong_side = match direction {
                    Direction::Right | Direction::Down => on_left,
                    Direction::Left | Direction::Up => !on_left,
                };
                if wrong_side {
                    let target_subtree = if on_left { right.as_ref() } else { left.as_ref() };
                    return Some(Self::descend_nearest(target_subtree));
                }
            }
        }
        None
    }

    fn path_to<'a>(node: &'a PaneNode, target: PaneId, mut acc: Vec<&'a PaneNode>) -> Option<Vec<&'a PaneNode>> {
        acc.push(node);
        match node {
            PaneNode::Leaf(l) if l.pane == target => Some(acc),
            PaneNode::Leaf(_) => None,
            PaneNode::Split { left, right, .. } => {
                Self::path_to(left, target, acc.clone()).or_else(|| Self::path_to(right, target, acc))
            }
            PaneNode::Stack { children, .. } => {
                if children.iter().any(|c| c.pane == target) {
                    Some(acc)
                } else {
                    None
                }
            }
        }
    }

    fn contains_leaf(node: &PaneNode, target: PaneId) -> bool {
        match node {
            PaneNode::Leaf(l) => l.pane == target,
            PaneNode::Split { left, right, .. } => {
                Self::contains_leaf(left, target) || Self::contains_leaf(right, target)
            }
            PaneNode::Stack { children, .. } => children.iter().any(|c| c.pane == target),
        }
    }

    // Descends into the subtree choosing the child closest to the original
    // leaf: leftmost/topmost child at each split.
    fn descend_nearest(node: &PaneNode) -> PaneId {
        match node {
            PaneNode::Leaf(l) => l.pane,
            PaneNode::Split { left, .. } => Self::descend_nearest(left),
            PaneNode::Stack { children, active_index, .. } => children[*active_index].pane,
        }
    }

    pub fn set_split_ratio(&mut self, node_id: NodeId, ratio: f64) -> Result<(), TreeError> {
        let ratio = ratio.clamp(0.05, 0.95);
        if Self::set_ratio_at(&mut self.root, node_id, ratio) {
            Ok(())
        } else {
            Err(TreeError::LeafNotFound(PaneId::next()))
        }
    }

    fn set_ratio_at(node: &mut PaneNode, node_id: NodeId, ratio: f64) -> bool {
        match node {
            PaneNode::Split { node: id, left, right, ratio: r, .. } if *id == node_id => {
                *r = ratio;
                let _ = (left, right);
                true
            }
            PaneNode::Split { left, right, .. } => {
                Self::set_ratio_at(left, node_id, ratio) || Self::set_ratio_at(right, node_id, ratio)
            }
            _ => false,
        }
    }

    pub fn set_stack_active(&mut self, node_id: NodeId, index: usize) -> Result<PaneId, TreeError> {
        Self::set_active_at(&mut self.root, node_id, index).ok_or(TreeError::LastLeaf)
    }

    fn set_active_at(node: &mut PaneNode, node_id: NodeId, index: usize) -> Option<PaneId> {
        match node {
            PaneNode::Stack { node: id, children, active_index } if *id == node_id => {
                let clamped = index.min(children.len() - 1);
                *active_index = clamped;
                Some(children[clamped].pane)
            }
            PaneNode::Split { left, right, .. } => {
                Self::set_active_at(left, node_id, index).or_else(|| Self::set_active_at(right, node_id, index))
            }
            _ => None,
        }
    }

    // Invariant checks 1-6 from spec §3.2, used by tests and debug
    // assertions at edit sites.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.leaf_count() == 0 {
            return Err("tree has no leaves".into());
        }
        Self::check_node(&self.root)
    }

    fn check_node(node: &PaneNode) -> Result<(), String> {
        match node {
            PaneNode::Leaf(_) => Ok(()),
            PaneNode::Split { ratio, left, right, .. } => {
                if !(0.05..=0.95).contains(ratio) {
                    return Err(format!("split ratio {ratio} out of range"));
                }
                Self::check_node(left)?;
                Self::check_node(right)
            }
            PaneNode::Stack { children, active_index, .. } => {
                if children.is_empty() {
                    return Err("stack has no children".into());
                }
                if *active_index >= children.len() {
                    return Err("stack active_index out of range".into());
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_right_then_close_restores_shape() {
        let p1 = PaneId::next();
        let mut tree = PaneTree::new(p1);
        let p2 = PaneId::next();
        tree.split(p1, Direction::Right, p2).unwrap();
        tree.check_invariants().unwrap();
        assert!(matches!(tree.root(), PaneNode::Split { .. }));

        let (outcome, _mirror_info) = tree.close(p2).unwrap();
        assert_eq!(outcome, CloseOutcome::PromotedSibling(p1));
        assert!(matches!(tree.root(), PaneNode::Leaf(l) if l.pane == p1));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn stack_grows_then_degenerates() {
        let p1 = PaneId::next();
        let mut tree = PaneTree::new(p1);
        let p2 = PaneId::next();
        let p3 = PaneId::next();
        tree.stack(p1, p2).unwrap();
        tree.stack(p1, p3).unwrap();
        tree.check_invariants().unwrap();

        match tree.root() {
            PaneNode::Stack { children, active_index, .. } => {
                assert_eq!(children.len(), 3);
                assert_eq!(*active_index, 2);
            }
            other => panic!("expected stack, got {other}"),
        }

        let (outcome, _mirror_info) = tree.close(p3).unwrap();
        assert!(matches!(outcome, CloseOutcome::StackShrunk { active } if active == p2));

        let (outcome, mirror_info) = tree.close(p2).unwrap();
        assert_eq!(outcome, CloseOutcome::StackDegenerated(p1));
        assert!(matches!(tree.root(), PaneNode::Leaf(l) if l.pane == p1));
        let remaining_node = tree.find_leaf(p1).unwrap();
        assert!(matches!(
            mirror_info,
            MirrorCloseInfo::StackDegenerated { remaining_node: n, .. } if n == remaining_node
        ));
    }

    #[test]
    fn splitting_a_stacked_leaf_keeps_every_pane() {
        let p1 = PaneId::next();
        let mut tree = PaneTree::new(p1);
        let p2 = PaneId::next();
        tree.stack(p1, p2).unwrap();

        let p3 = PaneId::next();
        let outcome = tree.split(p2, Direction::Right, p3).unwrap();
        tree.check_invariants().unwrap();
        assert!(outcome.replaced_container.is_some());

        let mut leaves = tree.leaves();
        leaves.sort();
        let mut expected = vec![p1, p2, p3];
        expected.sort();
        assert_eq!(leaves, expected);
    }

    #[test]
    fn geometric_navigation_matches_scenario_3() {
        // Split{H, Split{V, A, B}, Split{V, C, D}}
        let a = PaneId::next();
        let mut tree = PaneTree::new(a);
        let b = PaneId::next();
        tree.split(a, Direction::Down, b).unwrap();
        let c = PaneId::next();
        tree.split(a, Direction::Right, c).unwrap();
        let d = PaneId::next();
        tree.split(c, Direction::Down, d).unwrap();

        assert_eq!(tree.neighbor(a, Direction::Right), Some(c));
        assert_eq!(tree.neighbor(c, Direction::Down), Some(d));
        assert_eq!(tree.neighbor(d, Direction::Left), Some(b));
    }

    #[test]
    fn neighbor_then_opposite_returns_to_start_from_non_edge() {
        let a = PaneId::next();
        let mut tree = PaneTree::new(a);
        let b = PaneId::next();
        tree.split(a, Direction::Right, b).unwrap();

        let right = tree.neighbor(a, Direction::Right).unwrap();
        let back = tree.neighbor(right, Direction::Left).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn closing_last_leaf_fails() {
        let p1 = PaneId::next();
        let mut tree = PaneTree::new(p1);
        assert!(matches!(tree.close(p1), Err(TreeError::LastLeaf)));
    }

    #[test]
    fn close_of_unknown_pane_fails() {
        let p1 = PaneId::next();
        let mut tree = PaneTree::new(p1);
        let p2 = PaneId::next();
        tree.split(p1, Direction::Right, PaneId::next()).unwrap();
        assert!(matches!(tree.close(p2), Err(TreeError::LeafNotFound(_))));
    }
}
