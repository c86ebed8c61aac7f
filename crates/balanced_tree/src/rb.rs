use std::cmp::Ordering;
use std::fmt;
use std::mem;

use log::{debug, trace};

use crate::OrderedSet;
use crate::compare::{Compare, Natural};
use crate::error::TreeError;

#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Id(u32);

impl Id {
    const NIL: Self = Self(u32::MAX);

    #[inline(always)]
    fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline(always)]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[inline(always)]
fn id(v: usize) -> Id {
    debug_assert!(v < u32::MAX as usize);
    Id(v as u32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Clone)]
struct Node<T> {
    value: T,
    /// `ch[0]` is the left child, `ch[1]` the right one.
    ch: [Id; 2],
    /// Navigation only; never owns.
    p: Id,
    color: Color,
}

/// Red-black ordered set.
///
/// Nodes live in a flat arena and refer to each other by index, so the parent
/// link is a plain integer. Removing a node moves the last arena slot into the
/// freed one.
#[derive(Clone)]
pub struct RbTree<T, C = Natural> {
    nodes: Vec<Node<T>>,
    root: Id,
    cmp: C,
}

/// Borrowed view of a node of an [`RbTree`].
pub struct RbNode<'a, T> {
    nodes: &'a [Node<T>],
    id: Id,
}

impl<T> Clone for RbNode<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RbNode<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for RbNode<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbNode")
            .field("value", self.value())
            .field("color", &self.color())
            .finish()
    }
}

impl<'a, T> RbNode<'a, T> {
    fn at(nodes: &'a [Node<T>], id: Id) -> Option<Self> {
        if id.is_nil() {
            None
        } else {
            Some(Self { nodes, id })
        }
    }

    fn node(&self) -> &'a Node<T> {
        &self.nodes[self.id.idx()]
    }

    pub fn value(&self) -> &'a T {
        &self.node().value
    }

    pub fn color(&self) -> Color {
        self.node().color
    }

    pub fn left(&self) -> Option<RbNode<'a, T>> {
        Self::at(self.nodes, self.node().ch[0])
    }

    pub fn right(&self) -> Option<RbNode<'a, T>> {
        Self::at(self.nodes, self.node().ch[1])
    }

    pub fn parent(&self) -> Option<RbNode<'a, T>> {
        Self::at(self.nodes, self.node().p)
    }
}

impl<T: Ord> RbTree<T> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T, C: Compare<T> + Default> Default for RbTree<T, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T, C> RbTree<T, C> {
    pub fn root(&self) -> Option<RbNode<'_, T>> {
        RbNode::at(&self.nodes, self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn clear(&mut self) {
        debug!("rb: clearing {} nodes", self.nodes.len());
        self.nodes.clear();
        self.root = Id::NIL;
    }

    /// Number of black nodes on a path from the root down to a leaf.
    pub fn black_height(&self) -> usize {
        let mut height = 0;
        let mut cur = self.root;
        while !cur.is_nil() {
            if self.node(cur).color == Color::Black {
                height += 1;
            }
            cur = self.node(cur).ch[0];
        }
        height
    }

    pub fn for_each_in_order<F: FnMut(&T)>(&self, mut f: F) {
        self.walk_in_order(self.root, &mut f);
    }

    pub fn for_each_pre_order<F: FnMut(&T)>(&self, mut f: F) {
        self.walk_pre_order(self.root, &mut f);
    }

    pub fn for_each_post_order<F: FnMut(&T)>(&self, mut f: F) {
        self.walk_post_order(self.root, &mut f);
    }

    /// Clones every value in comparator order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.for_each_in_order(|v| out.push(v.clone()));
        out
    }

    fn walk_in_order<F: FnMut(&T)>(&self, x: Id, f: &mut F) {
        if x.is_nil() {
            return;
        }
        let [l, r] = self.node(x).ch;
        self.walk_in_order(l, f);
        f(&self.node(x).value);
        self.walk_in_order(r, f);
    }

    fn walk_pre_order<F: FnMut(&T)>(&self, x: Id, f: &mut F) {
        if x.is_nil() {
            return;
        }
        let [l, r] = self.node(x).ch;
        f(&self.node(x).value);
        self.walk_pre_order(l, f);
        self.walk_pre_order(r, f);
    }

    fn walk_post_order<F: FnMut(&T)>(&self, x: Id, f: &mut F) {
        if x.is_nil() {
            return;
        }
        let [l, r] = self.node(x).ch;
        self.walk_post_order(l, f);
        self.walk_post_order(r, f);
        f(&self.node(x).value);
    }

    #[inline(always)]
    fn node(&self, x: Id) -> &Node<T> {
        debug_assert!(!x.is_nil());
        &self.nodes[x.idx()]
    }

    #[inline(always)]
    fn node_mut(&mut self, x: Id) -> &mut Node<T> {
        debug_assert!(!x.is_nil());
        &mut self.nodes[x.idx()]
    }

    /// Absent children count as black.
    #[inline(always)]
    fn color(&self, x: Id) -> Color {
        if x.is_nil() {
            Color::Black
        } else {
            self.node(x).color
        }
    }

    #[inline(always)]
    fn set_color(&mut self, x: Id, color: Color) {
        self.node_mut(x).color = color;
    }

    fn alloc(&mut self, value: T, p: Id) -> Id {
        let x = id(self.nodes.len());
        self.nodes.push(Node {
            value,
            ch: [Id::NIL, Id::NIL],
            p,
            color: Color::Red,
        });
        x
    }

    /// Frees the slot of `z`, which must already be unlinked from the tree.
    fn release(&mut self, z: Id) -> T {
        let last = id(self.nodes.len() - 1);
        let node = self.nodes.swap_remove(z.idx());
        if last != z {
            let p = self.node(z).p;
            let [l, r] = self.node(z).ch;
            self.replace_child(p, last, z);
            for c in [l, r] {
                if !c.is_nil() {
                    self.node_mut(c).p = z;
                }
            }
        }
        node.value
    }

    /// Points the child slot of `parent` that holds `old` at `new`; a nil
    /// `parent` means the root.
    fn replace_child(&mut self, parent: Id, old: Id, new: Id) {
        if parent.is_nil() {
            self.root = new;
            return;
        }
        let pn = self.node_mut(parent);
        if pn.ch[0] == old {
            pn.ch[0] = new;
        } else {
            debug_assert_eq!(pn.ch[1], old, "broken parent link");
            pn.ch[1] = new;
        }
    }

    /// Moves `x` down towards side `d`, lifting its child on the other side:
    /// `d == 0` is a left rotation, `d == 1` a right one.
    fn rotate(&mut self, x: Id, d: usize) {
        let y = self.node(x).ch[d ^ 1];
        assert!(!y.is_nil(), "rotation needs a child to lift");
        let inner = self.node(y).ch[d];
        self.node_mut(x).ch[d ^ 1] = inner;
        if !inner.is_nil() {
            self.node_mut(inner).p = x;
        }
        let xp = self.node(x).p;
        self.node_mut(y).p = xp;
        self.replace_child(xp, x, y);
        self.node_mut(y).ch[d] = x;
        self.node_mut(x).p = y;
    }

    /// Puts `v` where `u` hangs. `u` keeps its own child links.
    fn transplant(&mut self, u: Id, v: Id) {
        let up = self.node(u).p;
        self.replace_child(up, u, v);
        if !v.is_nil() {
            self.node_mut(v).p = up;
        }
    }

    fn minimum(&self, mut x: Id) -> Id {
        while !self.node(x).ch[0].is_nil() {
            x = self.node(x).ch[0];
        }
        x
    }

    fn side(&self, x: Id, p: Id) -> usize {
        (self.node(p).ch[1] == x) as usize
    }

    fn fix_insert(&mut self, mut x: Id) {
        loop {
            let mut p = self.node(x).p;
            if p.is_nil() || self.color(p) == Color::Black {
                break;
            }
            let g = self.node(p).p;
            assert!(!g.is_nil(), "red parent cannot be the root");
            let d = self.side(p, g);
            let uncle = self.node(g).ch[d ^ 1];

            if self.color(uncle) == Color::Red {
                trace!("rb insert: recolor");
                self.set_color(p, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(g, Color::Red);
                x = g;
                continue;
            }

            if self.node(p).ch[d ^ 1] == x {
                trace!("rb insert: straighten inner child");
                x = p;
                self.rotate(x, d);
                p = self.node(x).p;
            }
            trace!("rb insert: rotate grandparent");
            self.set_color(p, Color::Black);
            self.set_color(g, Color::Red);
            self.rotate(g, d ^ 1);
            break;
        }

        let root = self.root;
        self.set_color(root, Color::Black);
    }

    fn delete_node(&mut self, z: Id) {
        let [zl, zr] = self.node(z).ch;
        let zp = self.node(z).p;
        let mut removed_color = self.node(z).color;
        let x;
        let x_parent;

        if zl.is_nil() {
            x = zr;
            x_parent = zp;
            self.transplant(z, zr);
        } else if zr.is_nil() {
            x = zl;
            x_parent = zp;
            self.transplant(z, zl);
        } else {
            let y = self.minimum(zr);
            removed_color = self.node(y).color;
            x = self.node(y).ch[1];
            if self.node(y).p == z {
                x_parent = y;
            } else {
                x_parent = self.node(y).p;
                self.transplant(y, x);
                self.node_mut(y).ch[1] = zr;
                self.node_mut(zr).p = y;
            }
            self.transplant(z, y);
            self.node_mut(y).ch[0] = zl;
            self.node_mut(zl).p = y;
            let z_color = self.node(z).color;
            self.set_color(y, z_color);
        }

        if removed_color == Color::Black {
            self.fix_delete(x, x_parent);
        }
    }

    /// `x` may be nil, so its parent is tracked separately.
    fn fix_delete(&mut self, mut x: Id, mut p: Id) {
        while x != self.root && self.color(x) == Color::Black {
            let d = if self.node(p).ch[0] == x { 0 } else { 1 };
            let mut w = self.node(p).ch[d ^ 1];

            if self.color(w) == Color::Red {
                trace!("rb remove: red sibling");
                self.set_color(w, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, d);
                w = self.node(p).ch[d ^ 1];
            }

            let [near, far] = {
                let ch = self.node(w).ch;
                [ch[d], ch[d ^ 1]]
            };
            if self.color(near) == Color::Black && self.color(far) == Color::Black {
                trace!("rb remove: black sibling with black children");
                self.set_color(w, Color::Red);
                x = p;
                p = self.node(x).p;
                continue;
            }

            if self.color(far) == Color::Black {
                trace!("rb remove: near nephew red");
                self.set_color(near, Color::Black);
                self.set_color(w, Color::Red);
                self.rotate(w, d ^ 1);
                w = self.node(p).ch[d ^ 1];
            }

            trace!("rb remove: far nephew red");
            let p_color = self.node(p).color;
            self.set_color(w, p_color);
            self.set_color(p, Color::Black);
            let far = self.node(w).ch[d ^ 1];
            self.set_color(far, Color::Black);
            self.rotate(p, d);
            x = self.root;
        }

        if !x.is_nil() {
            self.set_color(x, Color::Black);
        }
    }
}

impl<T, C: Compare<T>> RbTree<T, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: Vec::new(),
            root: Id::NIL,
            cmp,
        }
    }

    /// Inserts `value`, returning the value it replaced if an equal key was
    /// already present.
    pub fn insert(&mut self, value: T) -> Option<T> {
        let mut parent = Id::NIL;
        let mut d = 0;
        let mut cur = self.root;
        while !cur.is_nil() {
            match self.cmp.compare(&value, &self.node(cur).value) {
                Ordering::Less => d = 0,
                Ordering::Greater => d = 1,
                Ordering::Equal => {
                    return Some(mem::replace(&mut self.node_mut(cur).value, value));
                }
            }
            parent = cur;
            cur = self.node(cur).ch[d];
        }

        let x = self.alloc(value, parent);
        if parent.is_nil() {
            self.root = x;
        } else {
            self.node_mut(parent).ch[d] = x;
        }
        self.fix_insert(x);
        None
    }

    /// Like [`insert`](Self::insert), for callers holding a possibly absent
    /// value. `None` is rejected without touching the tree.
    pub fn try_insert(&mut self, value: Option<T>) -> Result<Option<T>, TreeError> {
        let value = value.ok_or(TreeError::InvalidInput)?;
        Ok(self.insert(value))
    }

    pub fn find(&self, value: &T) -> Option<RbNode<'_, T>> {
        RbNode::at(&self.nodes, self.find_id(value))
    }

    pub fn get(&self, value: &T) -> Option<&T> {
        let x = self.find_id(value);
        (!x.is_nil()).then(|| &self.node(x).value)
    }

    pub fn contains(&self, value: &T) -> bool {
        !self.find_id(value).is_nil()
    }

    /// Removes the value equal to `value` and returns it.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let z = self.find_id(value);
        if z.is_nil() {
            return None;
        }
        self.delete_node(z);
        Some(self.release(z))
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

    /// Checks order, parent links, coloring, black-height and node count.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        if self.root.is_nil() {
            if !self.nodes.is_empty() {
                return Err(TreeError::InvariantViolation(format!(
                    "empty tree holds {} nodes",
                    self.nodes.len()
                )));
            }
            return Ok(());
        }
        if !self.node(self.root).p.is_nil() {
            return Err(TreeError::InvariantViolation("root has a parent".into()));
        }
        if self.node(self.root).color != Color::Black {
            return Err(TreeError::InvariantViolation("root is red".into()));
        }
        let (_, count) = self.check_node(self.root, None, None)?;
        if count != self.nodes.len() {
            return Err(TreeError::InvariantViolation(format!(
                "arena holds {} nodes but {} are reachable",
                self.nodes.len(),
                count
            )));
        }
        Ok(())
    }

    fn check_node(
        &self,
        x: Id,
        lower: Option<&T>,
        upper: Option<&T>,
    ) -> Result<(usize, usize), TreeError> {
        if x.is_nil() {
            return Ok((1, 0));
        }
        let node = self.node(x);
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
        for c in node.ch {
            if c.is_nil() {
                continue;
            }
            if self.node(c).p != x {
                return Err(TreeError::InvariantViolation(
                    "child does not point back to its parent".into(),
                ));
            }
            if node.color == Color::Red && self.node(c).color == Color::Red {
                return Err(TreeError::InvariantViolation(
                    "red node has a red child".into(),
                ));
            }
        }

        let (bl, nl) = self.check_node(node.ch[0], lower, Some(&node.value))?;
        let (br, nr) = self.check_node(node.ch[1], Some(&node.value), upper)?;
        if bl != br {
            return Err(TreeError::InvariantViolation(format!(
                "black-height differs between subtrees: {bl} vs {br}"
            )));
        }
        let own = if node.color == Color::Black { 1 } else { 0 };
        Ok((bl + own, 1 + nl + nr))
    }

    fn find_id(&self, value: &T) -> Id {
        let mut cur = self.root;
        while !cur.is_nil() {
            let node = self.node(cur);
            match self.cmp.compare(value, &node.value) {
                Ordering::Less => cur = node.ch[0],
                Ordering::Greater => cur = node.ch[1],
                Ordering::Equal => return cur,
            }
        }
        Id::NIL
    }
}

impl<T, C: Compare<T>> OrderedSet for RbTree<T, C> {
    type Value = T;

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn get(&self, value: &T) -> Option<&T> {
        RbTree::get(self, value)
    }

    fn insert(&mut self, value: T) -> Option<T> {
        RbTree::insert(self, value)
    }

    fn take(&mut self, value: &T) -> Option<T> {
        RbTree::take(self, value)
    }

    fn clear(&mut self) {
        RbTree::clear(self)
    }

    fn check_invariants(&self) -> Result<(), TreeError> {
        RbTree::check_invariants(self)
    }
}
