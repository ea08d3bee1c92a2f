// §4.C Widget Mirror: a GTK widget tree kept isomorphic to the Pane Tree.
//
// Every node id in the tree maps to exactly one GTK widget here: a leaf maps
// to its `PaneShell`, a split to a `gtk::Paned`, and a stack to a `gtk::Stack`
// holding each member's `PaneShell` as a named page (keyed by the member's
// node id). `PaneShell` already owns its own title-bar row, so the mirror
// only has to flip `set_title_bar_visible` on the active/inactive members
// rather than track a parallel row of its own.
//
// `parent_of` is the reverse of the tree's own parent links, rebuilt
// incrementally as edits land, so that inserting a split or stack around an
// already-placed leaf can find and replace that leaf's slot wherever it
// currently lives -- the root, a `Paned` child slot, or a `Stack` page --
// without the caller having to say where that is.
//
// Every such re-home also opens a `quiescence` window over the leaves that
// moved (§4.C/§8.1): callers that mutate a leaf's CSS classes (crash
// styling, etc.) must check `is_quiescent`/`quiescent_remaining` first and
// defer rather than mutate immediately after a move.

use std::time::Duration;

use ahash::AHashMap;
use gtk::prelude::*;

use crate::com::{NodeId, Orientation};

use super::element::PaneShell;
use super::quiescence::QuiescenceGate;

// Emitted to the mirror by the pane-tree-owning code after each mutation;
// translated 1:1 from spec §4.C's edit vocabulary.
pub enum Edit {
    // Registers a brand-new leaf's widget without attaching it anywhere.
    // Used for the new side of a split/stack just before the matching
    // `InsertSplit`/`InsertStack`, which does the actual attachment.
    RegisterLeaf { node: NodeId, shell: PaneShell },
    InsertLeaf { node: NodeId, parent: Option<NodeId>, shell: PaneShell },
    InsertSplit { node: NodeId, orientation: Orientation, ratio: f64, left: NodeId, right: NodeId },
    InsertStack { node: NodeId, existing_leaf: NodeId, new_leaf: NodeId },
    RemoveSubtree { node: NodeId },
    PromoteChild { removed_container: NodeId, promoted_node: NodeId },
    DegenerateStack { removed_container: NodeId, remaining_node: NodeId },
    SetSplitRatio { node: NodeId, ratio: f64 },
    SetStackActive { node: NodeId, child: NodeId },
}

enum Widget {
    Leaf(PaneShell),
    Split { container: gtk::Paned, ratio: f64, left: NodeId, right: NodeId },
    Stack { content: gtk::Stack, members: Vec<NodeId> },
}

pub struct WidgetMirror {
    root_container: gtk::Box,
    widgets: AHashMap<NodeId, Widget>,
    // Reverse of the tree's parent links, kept in step with `widgets` so
    // that any node can be re-homed without the caller naming its slot.
    parent_of: AHashMap<NodeId, Option<NodeId>>,
    root_node: Option<NodeId>,
    quiescence: QuiescenceGate,
}

impl WidgetMirror {
    pub fn new() -> Self {
        let root_container = gtk::Box::new(gtk::Orientation::Vertical, 0);
        Self {
            root_container,
            widgets: AHashMap::new(),
            parent_of: AHashMap::new(),
            root_node: None,
            quiescence: QuiescenceGate::new(),
        }
    }

    /// §8.1: true while `node` is inside its post-reparent quiescence
    /// window, during which callers must not mutate its CSS classes.
    pub fn is_quiescent(&self, node: NodeId) -> bool {
        self.quiescence.is_quiescent(node)
    }

    /// Time left in `node`'s quiescence window, for callers that want to
    /// defer a suppressed CSS mutation rather than drop it.
    pub fn quiescent_remaining(&self, node: NodeId) -> Option<Duration> {
        self.quiescence.remaining(node)
    }

    // Opens a quiescence window over every leaf under `node` (itself
    // included, if `node` is a leaf) -- a reparented split or stack carries
    // its whole subtree of leaves across the move.
    fn mark_quiescent(&mut self, node: NodeId) {
        for leaf in self.leaf_nodes_under(node) {
            self.quiescence.open(leaf);
        }
    }

    fn leaf_nodes_under(&self, node: NodeId) -> Vec<NodeId> {
        match self.widgets.get(&node) {
            Some(Widget::Leaf(_)) => vec![node],
            Some(Widget::Split { left, right, .. }) => {
                let mut leaves = self.leaf_nodes_under(*left);
                leaves.extend(self.leaf_nodes_under(*right));
                leaves
            }
            Some(Widget::Stack { members, .. }) => {
                members.iter().flat_map(|m| self.leaf_nodes_under(*m)).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn root_widget(&self) -> &gtk::Box {
        &self.root_container
    }

    pub fn apply(&mut self, edit: Edit) {
        match edit {
            Edit::RegisterLeaf { node, shell } => self.register_leaf(node, shell),
            Edit::InsertLeaf { node, parent, shell } => self.insert_leaf(node, parent, shell),
            Edit::InsertSplit { node, orientation, ratio, left, right } => {
                self.insert_split(node, orientation, ratio, left, right)
            }
            Edit::InsertStack { node, existing_leaf, new_leaf } => {
                self.insert_stack(node, existing_leaf, new_leaf)
            }
            Edit::RemoveSubtree { node } => self.remove_subtree(node),
            Edit::PromoteChild { removed_container, promoted_node } => {
                self.promote_child(removed_container, promoted_node)
            }
            Edit::DegenerateStack { removed_container, remaining_node } => {
                self.degenerate_stack(removed_container, remaining_node)
            }
            Edit::SetSplitRatio { node, ratio } => self.set_split_ratio(node, ratio),
            Edit::SetStackActive { node, child } => self.set_stack_active(node, child),
        }
    }

    fn register_leaf(&mut self, node: NodeId, shell: PaneShell) {
        self.widgets.insert(node, Widget::Leaf(shell));
    }

    fn insert_leaf(&mut self, node: NodeId, parent: Option<NodeId>, shell: PaneShell) {
        if parent.is_none() {
            self.root_container.append(shell.widget());
            self.root_node = Some(node);
            self.parent_of.insert(node, None);
            self.widgets.insert(node, Widget::Leaf(shell));
            return;
        }

        let p = parent.unwrap();
        if let Some(Widget::Stack { content, members }) = self.widgets.get_mut(&p) {
            content.add_named(shell.widget(), Some(&node.to_string()));
            members.push(node);
        }
        self.parent_of.insert(node, parent);
        self.widgets.insert(node, Widget::Leaf(shell));
        self.set_stack_active(p, node);
    }

    // Returns the widget currently representing `node`, whatever kind it is.
    fn widget_of(&self, node: NodeId) -> Option<gtk::Widget> {
        match self.widgets.get(&node)? {
            Widget::Leaf(shell) => Some(shell.widget().clone()),
            Widget::Split { container, .. } => Some(container.clone().upcast()),
            Widget::Stack { content, .. } => Some(content.clone().upcast()),
        }
    }

    // Drops `widget` into whatever slot `old_occupant` used to hold under
    // `parent` (or the mirror's root, if `parent` is `None`), and records
    // `new_occupant` as the thing now living there.
    fn place(&mut self, old_occupant: NodeId, new_occupant: NodeId, parent: Option<NodeId>, widget: &gtk::Widget) {
        match parent {
            None => {
                self.root_container.append(widget);
                self.root_node = Some(new_occupant);
            }
            Some(p) => match self.widgets.get_mut(&p) {
                Some(Widget::Split { container, left, right, .. }) => {
                    if *left == old_occupant {
                        container.set_start_child(Some(widget));
                        *left = new_occupant;
                    } else if *right == old_occupant {
                        container.set_end_child(Some(widget));
                        *right = new_occupant;
                    }
                }
                Some(Widget::Stack { content, members }) => {
                    content.add_named(widget, Some(&new_occupant.to_string()));
                    if let Some(slot) = members.iter_mut().find(|m| **m == old_occupant) {
                        *slot = new_occupant;
                    } else {
                        members.push(new_occupant);
                    }
                }
                _ => {}
            },
        }
        self.parent_of.insert(new_occupant, parent);
    }

    // Detaches whatever widget occupies `removed_container`'s old slot and
    // puts `new_occupant`'s widget there instead -- the shared re-homing
    // step behind promote-on-close and degenerate-on-close.
    fn replace_subtree(&mut self, removed_container: NodeId, new_occupant: NodeId) {
        let parent = self.parent_of.get(&removed_container).copied().flatten();
        if let Some(widget) = self.widget_of(new_occupant) {
            if widget.parent().is_some() {
                widget.unparent();
            }
            self.place(removed_container, new_occupant, parent, &widget);
            self.mark_quiescent(new_occupant);
        }
        self.widgets.remove(&removed_container);
        self.parent_of.remove(&removed_container);
    }

    fn insert_split(&mut self, node: NodeId, orientation: Orientation, ratio: f64, left: NodeId, right: NodeId) {
        let gtk_orientation = match orientation {
            Orientation::Horizontal => gtk::Orientation::Horizontal,
            Orientation::Vertical => gtk::Orientation::Vertical,
        };
        let paned = gtk::Paned::new(gtk_orientation);

        let left_widget = self.widget_of(left);
        let right_widget = self.widget_of(right);
        if let Some(w) = &left_widget {
            if w.parent().is_some() {
                w.unparent();
            }
            paned.set_start_child(Some(w));
        }
        if let Some(w) = &right_widget {
            if w.parent().is_some() {
                w.unparent();
            }
            paned.set_end_child(Some(w));
        }

        // Ratio is applied on first allocation -- the container doesn't
        // have an extent to translate against until then.
        let ratio_captured = ratio;
        paned.connect_map(move |p| {
            let extent = if p.orientation() == gtk::Orientation::Horizontal {
                p.allocated_width()
            } else {
                p.allocated_height()
            };
            if extent > 0 {
                p.set_position((extent as f64 * ratio_captured) as i32);
            }
        });

        // Whichever of `left`/`right` already had a home (the pre-existing
        // leaf being split) tells us where the new Paned itself belongs;
        // the other side is the freshly provisioned leaf, with no home yet.
        let host_parent = self
            .parent_of
            .get(&left)
            .or_else(|| self.parent_of.get(&right))
            .copied()
            .flatten();
        let existing = if self.parent_of.contains_key(&left) { left } else { right };

        self.widgets.insert(node, Widget::Split { container: paned.clone(), ratio, left, right });
        self.parent_of.insert(left, Some(node));
        self.parent_of.insert(right, Some(node));

        self.place(existing, node, host_parent, paned.upcast_ref());
        self.mark_quiescent(existing);
    }

    fn insert_stack(&mut self, node: NodeId, existing_leaf: NodeId, new_leaf: NodeId) {
        let content = gtk::Stack::new();

        let existing_widget = self.widget_of(existing_leaf);
        if let Some(w) = &existing_widget {
            if w.parent().is_some() {
                w.unparent();
            }
            content.add_named(w, Some(&existing_leaf.to_string()));
        }
        if let Some(Widget::Leaf(shell)) = self.widgets.get(&existing_leaf) {
            shell.set_title_bar_visible(true);
        }

        if let Some(w) = self.widget_of(new_leaf) {
            content.add_named(&w, Some(&new_leaf.to_string()));
        }
        if let Some(Widget::Leaf(shell)) = self.widgets.get(&new_leaf) {
            shell.set_title_bar_visible(false);
        }
        content.set_visible_child_name(&new_leaf.to_string());

        let host_parent = self.parent_of.get(&existing_leaf).copied().flatten();

        self.widgets.insert(node, Widget::Stack { content: content.clone(), members: vec![existing_leaf, new_leaf] });
        self.parent_of.insert(existing_leaf, Some(node));
        self.parent_of.insert(new_leaf, Some(node));

        self.place(existing_leaf, node, host_parent, content.upcast_ref());
        self.mark_quiescent(existing_leaf);
    }

    fn remove_subtree(&mut self, node: NodeId) {
        let parent = self.parent_of.remove(&node).flatten();
        if let Some(parent) = parent {
            if let Some(Widget::Stack { members, .. }) = self.widgets.get_mut(&parent) {
                members.retain(|m| *m != node);
            }
        }
        if let Some(widget) = self.widgets.remove(&node) {
            match widget {
                Widget::Leaf(shell) => shell.widget().unparent(),
                Widget::Split { container, .. } => container.unparent(),
                Widget::Stack { content, .. } => content.unparent(),
            }
        }
    }

    // §4.D rule 2, Split case: `removed_container`'s Paned is gone, replaced
    // in its old slot by whatever `promoted_node` resolves to.
    fn promote_child(&mut self, removed_container: NodeId, promoted_node: NodeId) {
        self.replace_subtree(removed_container, promoted_node);
    }

    // §4.D rule 2, Stack case: the stack at `removed_container` collapsed to
    // a single member, which leaves stack-member status and is re-homed in
    // its place as a plain leaf.
    fn degenerate_stack(&mut self, removed_container: NodeId, remaining_node: NodeId) {
        if let Some(Widget::Leaf(shell)) = self.widgets.get(&remaining_node) {
            shell.set_title_bar_visible(false);
        }
        self.replace_subtree(removed_container, remaining_node);
    }

    fn set_split_ratio(&mut self, node: NodeId, ratio: f64) {
        if let Some(Widget::Split { container, ratio: stored, .. }) = self.widgets.get_mut(&node) {
            *stored = ratio;
            let extent = if container.orientation() == gtk::Orientation::Horizontal {
                container.allocated_width()
            } else {
                container.allocated_height()
            };
            if extent > 0 {
                container.set_position((extent as f64 * ratio) as i32);
            }
        }
    }

    fn set_stack_active(&mut self, node: NodeId, child: NodeId) {
        let Some(Widget::Stack { content, members }) = self.widgets.get(&node) else { return };
        content.set_visible_child_name(&child.to_string());
        let members = members.clone();
        for member in members {
            if let Some(Widget::Leaf(shell)) = self.widgets.get(&member) {
                shell.set_title_bar_visible(member != child);
            }
        }
    }
}

impl Default for WidgetMirror {
    fn default() -> Self {
        Self::new()
    }
}
