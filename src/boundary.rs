//! Boundary set S: which elements start a sublist.
//!
//! S is the first k-1 natural indices plus `head`; when `head < k` that is
//! just `0..k`. Lookups are O(1) arithmetic, no n-sized table.

use crate::list::{Index, NONE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundaries {
    k: Index,
    /// Element owned by the last id (k-1): `head` or `k-1`.
    last: Index,
    head_id: Index,
}

impl Boundaries {
    /// Caller guarantees `1 <= k <= n` and `head < n`.
    pub fn new(head: Index, k: Index) -> Self {
        debug_assert!(k >= 1);
        let (last, head_id) = if head < k { (k - 1, head) } else { (head, k - 1) };
        Self { k, last, head_id }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.k as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.k == 0
    }

    /// Boundary id of the list head.
    #[inline]
    pub fn head_id(&self) -> Index {
        self.head_id
    }

    /// Element where worker `id` starts walking.
    #[inline(always)]
    pub fn element(&self, id: Index) -> Index {
        if id + 1 == self.k { self.last } else { id }
    }

    /// Boundary id of `e`, or `NONE` if `e` is an interior element.
    /// `e == NONE` also maps to `NONE`.
    #[inline(always)]
    pub fn id_of(&self, e: Index) -> Index {
        if e < self.k - 1 {
            e
        } else if e == self.last {
            self.k - 1
        } else {
            NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_outside_prefix_takes_last_id() {
        let b = Boundaries::new(7, 3);
        assert_eq!(b.head_id(), 2);
        assert_eq!((0..3).map(|i| b.element(i)).collect::<Vec<_>>(), vec![0, 1, 7]);
        assert_eq!(b.id_of(7), 2);
        assert_eq!(b.id_of(2), NONE);
        assert_eq!(b.id_of(NONE), NONE);
    }

    #[test]
    fn head_inside_prefix_keeps_natural_ids() {
        let b = Boundaries::new(1, 3);
        assert_eq!(b.head_id(), 1);
        assert_eq!((0..3).map(|i| b.element(i)).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(b.id_of(2), 2);
        assert_eq!(b.id_of(3), NONE);
    }

    #[test]
    fn single_boundary_is_head() {
        let b = Boundaries::new(4, 1);
        assert_eq!(b.element(0), 4);
        assert_eq!(b.head_id(), 0);
        assert_eq!(b.id_of(0), NONE);
        assert_eq!(b.id_of(4), 0);
    }
}
