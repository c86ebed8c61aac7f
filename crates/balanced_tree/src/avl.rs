use std::cmp::Ordering;
use std::mem;

use log::{debug, trace};

use crate::OrderedSet;
use crate::compare::{Compare, Natural};
use crate::error::TreeError;

/// Height-balanced (AVL) ordered set.
///
/// Values comparing equal under the comparator are the same key, so inserting
/// one of them again replaces the stored value instead of adding a node.
#[derive(Clone)]
pub struct AvlTree<T, C = Natural> {
    root: Link<T>,
    len: usize,
    cmp: C,
}

type Link<T> = Option<Box<AvlNode<T>>>;

/// A node of an [`AvlTree`], exposed read-only for inspection.
#[derive(Clone)]
pub struct AvlNode<T> {
    value: T,
    height: i16,
    left: Link<T>,
    right: Link<T>,
}

impl<T> AvlNode<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn left(&self) -> Option<&AvlNode<T>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&AvlNode<T>> {
        self.right.as_deref()
    }

    /// Height of the subtree rooted here. A leaf has height 1.
    pub fn height(&self) -> usize {
        self.height as usize
    }

    fn link_height(node: &Link<T>) -> i16 {
        node.as_ref().map(|n| n.height).unwrap_or(0)
    }

    fn recalc(&mut self) {
        let hl = Self::link_height(&self.left);
        let hr = Self::link_height(&self.right);
        self.height = 1 + hl.max(hr);
    }

    fn balance_factor(&self) -> i16 {
        Self::link_height(&self.left) - Self::link_height(&self.right)
    }
}

impl<T: Ord> AvlTree<T> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T, C: Compare<T> + Default> Default for AvlTree<T, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T, C> AvlTree<T, C> {
    pub fn root(&self) -> Option<&AvlNode<T>> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the whole tree, 0 when empty.
    pub fn height(&self) -> usize {
        AvlNode::link_height(&self.root) as usize
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn clear(&mut self) {
        debug!("avl: clearing {} nodes", self.len);
        self.root = None;
        self.len = 0;
    }

    pub fn for_each_in_order<F: FnMut(&T)>(&self, mut f: F) {
        Self::walk_in_order(self.root.as_deref(), &mut f);
    }

    pub fn for_each_pre_order<F: FnMut(&T)>(&self, mut f: F) {
        Self::walk_pre_order(self.root.as_deref(), &mut f);
    }

    pub fn for_each_post_order<F: FnMut(&T)>(&self, mut f: F) {
        Self::walk_post_order(self.root.as_deref(), &mut f);
    }

    /// Clones every value in comparator order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.len);
        self.for_each_in_order(|v| out.push(v.clone()));
        out
    }

    fn walk_in_order<F: FnMut(&T)>(node: Option<&AvlNode<T>>, f: &mut F) {
        if let Some(node) = node {
            Self::walk_in_order(node.left(), f);
            f(&node.value);
            Self::walk_in_order(node.right(), f);
        }
    }

    fn walk_pre_order<F: FnMut(&T)>(node: Option<&AvlNode<T>>, f: &mut F) {
        if let Some(node) = node {
            f(&node.value);
            Self::walk_pre_order(node.left(), f);
            Self::walk_pre_order(node.right(), f);
        }
    }

    fn walk_post_order<F: FnMut(&T)>(node: Option<&AvlNode<T>>, f: &mut F) {
        if let Some(node) = node {
            Self::walk_post_order(node.left(), f);
            Self::walk_post_order(node.right(), f);
            f(&node.value);
        }
    }

    fn rotate_right(mut root: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        let mut left = root.left.take().expect("rotate_right needs left");
        root.left = left.right.take();
        root.recalc();
        left.right = Some(root);
        left.recalc();
        left
    }

    fn rotate_left(mut root: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        let mut right = root.right.take().expect("rotate_left needs right");
        root.right = right.left.take();
        root.recalc();
        right.left = Some(root);
        right.recalc();
        right
    }

    /// Rebalances after an insertion below `root`.
    ///
    /// `child_side` is the comparison of the inserted value against the child
    /// on the heavy side, taken while descending.
    fn rebalance_after_insert(
        mut root: Box<AvlNode<T>>,
        child_side: Ordering,
    ) -> Box<AvlNode<T>> {
        root.recalc();
        let bf = root.balance_factor();
        if bf > 1 {
            if child_side != Ordering::Less {
                trace!("avl insert: left-right rotation");
                let left = root.left.take().expect("left-heavy node has left");
                root.left = Some(Self::rotate_left(left));
            } else {
                trace!("avl insert: left-left rotation");
            }
            return Self::rotate_right(root);
        }
        if bf < -1 {
            if child_side != Ordering::Greater {
                trace!("avl insert: right-left rotation");
                let right = root.right.take().expect("right-heavy node has right");
                root.right = Some(Self::rotate_right(right));
            } else {
                trace!("avl insert: right-right rotation");
            }
            return Self::rotate_left(root);
        }
        root
    }

    /// Rebalances after a removal below `root`, choosing single or double
    /// rotation from the heavy child's own balance factor.
    fn rebalance(mut root: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        root.recalc();
        let bf = root.balance_factor();
        if bf > 1 {
            let left_bf = root.left.as_ref().map(|n| n.balance_factor()).unwrap_or(0);
            if left_bf < 0 {
                trace!("avl remove: left-right rotation");
                let left = root.left.take().expect("left-heavy node has left");
                root.left = Some(Self::rotate_left(left));
            } else {
                trace!("avl remove: left-left rotation");
            }
            return Self::rotate_right(root);
        }
        if bf < -1 {
            let right_bf = root.right.as_ref().map(|n| n.balance_factor()).unwrap_or(0);
            if right_bf > 0 {
                trace!("avl remove: right-left rotation");
                let right = root.right.take().expect("right-heavy node has right");
                root.right = Some(Self::rotate_right(right));
            } else {
                trace!("avl remove: right-right rotation");
            }
            return Self::rotate_left(root);
        }
        root
    }

    fn pop_min(mut node: Box<AvlNode<T>>) -> (Link<T>, Box<AvlNode<T>>) {
        match node.left.take() {
            None => {
                let right = node.right.take();
                (right, node)
            }
            Some(left) => {
                let (new_left, min_node) = Self::pop_min(left);
                node.left = new_left;
                (Some(Self::rebalance(node)), min_node)
            }
        }
    }
}

impl<T, C: Compare<T>> AvlTree<T, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
        }
    }

    /// Inserts `value`, returning the value it replaced if an equal key was
    /// already present.
    pub fn insert(&mut self, value: T) -> Option<T> {
        let (root, old, _) = Self::insert_node(&self.cmp, self.root.take(), value);
        self.root = Some(root);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Like [`insert`](Self::insert), for callers holding a possibly absent
    /// value. `None` is rejected without touching the tree.
    pub fn try_insert(&mut self, value: Option<T>) -> Result<Option<T>, TreeError> {
        let value = value.ok_or(TreeError::InvalidInput)?;
        Ok(self.insert(value))
    }

    pub fn find(&self, value: &T) -> Option<&AvlNode<T>> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            match self.cmp.compare(value, &node.value) {
                Ordering::Less => cur = node.left.as_deref(),
                Ordering::Greater => cur = node.right.as_deref(),
                Ordering::Equal => return Some(node),
            }
        }
        None
    }

    pub fn get(&self, value: &T) -> Option<&T> {
        self.find(value).map(|n| &n.value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    /// Removes the value equal to `value` and returns it.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let (root, removed) = Self::remove_node(&self.cmp, self.root.take(), value);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Replaces `old` with `new`. Does nothing and returns `false` when `old`
    /// is absent.
    pub fn update(&mut self, old: &T, new: T) -> bool {
        if !self.remove(old) {
            return false;
        }
        self.insert(new);
        true
    }

    /// Checks order, stored heights, balance and node count.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let (_, count) = self.check_node(self.root.as_deref(), None, None)?;
        if count != self.len {
            return Err(TreeError::InvariantViolation(format!(
                "len is {} but {} nodes are reachable",
                self.len, count
            )));
        }
        Ok(())
    }

    fn check_node(
        &self,
        node: Option<&AvlNode<T>>,
        lower: Option<&T>,
        upper: Option<&T>,
    ) -> Result<(i16, usize), TreeError> {
        let Some(node) = node else {
            return Ok((0, 0));
        };
        if let Some(lower) = lower
            && self.cmp.compare(lower, &node.value) != Ordering::Less
        {
            return Err(TreeError::InvariantViolation(
                "right subtree holds a value not greater than its ancestor".into(),
            ));
        }
        if let Some(upper) = upper
            && self.cmp.compare(&node.value, upper) != Ordering::Less
        {
            return Err(TreeError::InvariantViolation(
                "left subtree holds a value not less than its ancestor".into(),
            ));
        }

        let (hl, nl) = self.check_node(node.left(), lower, Some(&node.value))?;
        let (hr, nr) = self.check_node(node.right(), Some(&node.value), upper)?;
        let height = 1 + hl.max(hr);
        if node.height != height {
            return Err(TreeError::InvariantViolation(format!(
                "stored height {} differs from computed height {}",
                node.height, height
            )));
        }
        if (hl - hr).abs() > 1 {
            return Err(TreeError::InvariantViolation(format!(
                "balance factor {} out of range",
                hl - hr
            )));
        }
        Ok((height, 1 + nl + nr))
    }

    /// Returns the new subtree root, the replaced value if the key existed,
    /// and how `value` compared against the subtree root.
    fn insert_node(cmp: &C, root: Link<T>, value: T) -> (Box<AvlNode<T>>, Option<T>, Ordering) {
        let Some(mut node) = root else {
            return (Box::new(AvlNode::new(value)), None, Ordering::Equal);
        };

        let side = cmp.compare(&value, &node.value);
        match side {
            Ordering::Less => {
                let (left, old, child_side) = Self::insert_node(cmp, node.left.take(), value);
                node.left = Some(left);
                if old.is_some() {
                    return (node, old, side);
                }
                (Self::rebalance_after_insert(node, child_side), None, side)
            }
            Ordering::Greater => {
                let (right, old, child_side) = Self::insert_node(cmp, node.right.take(), value);
                node.right = Some(right);
                if old.is_some() {
                    return (node, old, side);
                }
                (Self::rebalance_after_insert(node, child_side), None, side)
            }
            Ordering::Equal => {
                let old = mem::replace(&mut node.value, value);
                (node, Some(old), side)
            }
        }
    }

    fn remove_node(cmp: &C, root: Link<T>, value: &T) -> (Link<T>, Option<T>) {
        let Some(mut node) = root else {
            return (None, None);
        };

        match cmp.compare(value, &node.value) {
            Ordering::Less => {
                let (left, removed) = Self::remove_node(cmp, node.left.take(), value);
                node.left = left;
                if removed.is_none() {
                    return (Some(node), None);
                }
                (Some(Self::rebalance(node)), removed)
            }
            Ordering::Greater => {
                let (right, removed) = Self::remove_node(cmp, node.right.take(), value);
                node.right = right;
                if removed.is_none() {
                    return (Some(node), None);
                }
                (Some(Self::rebalance(node)), removed)
            }
            Ordering::Equal => {
                let AvlNode {
                    value: removed,
                    left,
                    right,
                    ..
                } = *node;
                match (left, right) {
                    (None, child) | (child, None) => (child, Some(removed)),
                    (Some(left), Some(right)) => {
                        // The in-order successor takes over this position.
                        let (new_right, mut succ) = Self::pop_min(right);
                        succ.left = Some(left);
                        succ.right = new_right;
                        (Some(Self::rebalance(succ)), Some(removed))
                    }
                }
            }
        }
    }
}

impl<T, C: Compare<T>> OrderedSet for AvlTree<T, C> {
    type Value = T;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, value: &T) -> Option<&T> {
        AvlTree::get(self, value)
    }

    fn insert(&mut self, value: T) -> Option<T> {
        AvlTree::insert(self, value)
    }

    fn take(&mut self, value: &T) -> Option<T> {
        AvlTree::take(self, value)
    }

    fn clear(&mut self) {
        AvlTree::clear(self)
    }

    fn check_invariants(&self) -> Result<(), TreeError> {
        AvlTree::check_invariants(self)
    }
}
