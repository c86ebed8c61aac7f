pub mod avl;
pub mod compare;
pub mod error;
pub mod rb;

pub use avl::{AvlNode, AvlTree};
pub use compare::{Compare, Natural, Reverse};
pub use error::TreeError;
pub use rb::{Color, RbNode, RbTree};

/// Ordered set interface shared by the balanced trees.
///
/// - Values comparing equal under the tree's comparator are one key.
/// - `insert` of an existing key overwrites the stored value and returns the
///   old one; it never fails.
/// - Absent keys are reported through `false` / `None`, never as errors.
pub trait OrderedSet {
    type Value;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, value: &Self::Value) -> Option<&Self::Value>;

    fn contains(&self, value: &Self::Value) -> bool {
        self.get(value).is_some()
    }

    fn insert(&mut self, value: Self::Value) -> Option<Self::Value>;

    /// Rejects `None` with [`TreeError::InvalidInput`] and leaves the set
    /// untouched.
    fn try_insert(
        &mut self,
        value: Option<Self::Value>,
    ) -> Result<Option<Self::Value>, TreeError> {
        let value = value.ok_or(TreeError::InvalidInput)?;
        Ok(self.insert(value))
    }

    fn take(&mut self, value: &Self::Value) -> Option<Self::Value>;

    fn remove(&mut self, value: &Self::Value) -> bool {
        self.take(value).is_some()
    }

    /// Removes `old`, then inserts `new`. Returns `false` without touching the
    /// set when `old` is absent.
    fn update(&mut self, old: &Self::Value, new: Self::Value) -> bool {
        if !self.remove(old) {
            return false;
        }
        self.insert(new);
        true
    }

    fn clear(&mut self);

    fn check_invariants(&self) -> Result<(), TreeError>;
}
