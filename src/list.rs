//! Core data model: the input list, the working-buffer slot and the
//! per-sublist metadata produced by the walker.

/// Element index / sublist id / local offset. Fixed 32-bit width so a
/// working-buffer slot is one aligned 8-byte word.
pub type Index = u32;

/// Terminal sentinel ("none") in a next-array, and the reserved sublist id
/// meaning "walk reached the sentinel".
pub const NONE: Index = Index::MAX;

/// Largest list length we accept: every element index must stay below `NONE`.
pub const MAX_LEN: usize = (NONE - 1) as usize;

/// Implicit singly linked list: `next[i]` is the successor of `i`, the walk
/// starts at `head` and ends at `NONE`.
///
/// Precondition (not checked unless asked for): `head, next[head], ...`
/// visits every element of `0..n` exactly once before reaching `NONE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedList {
    pub next: Vec<Index>,
    pub head: Index,
}

impl LinkedList {
    pub fn new(next: Vec<Index>, head: Index) -> Self {
        Self { next, head }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.next.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// Sequential reference ranking: one pointer chase from head.
    /// Used as the oracle in tests and for tiny inputs in the CLI.
    pub fn rank_sequential(&self) -> Vec<Index> {
        let mut rank = vec![0 as Index; self.next.len()];
        let mut cur = self.head;
        let mut r: Index = 0;
        while cur != NONE {
            rank[cur as usize] = r;
            r += 1;
            cur = self.next[cur as usize];
        }
        rank
    }
}

/// One working-buffer entry: which sublist owns the element and how far the
/// element sits from that sublist's boundary.
#[repr(C, align(8))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    pub sublist: Index,
    pub offset: Index,
}

impl Slot {
    /// Packed form stored in the working buffer: offset in the high half,
    /// sublist id in the low half.
    #[inline(always)]
    pub fn to_bits(self) -> u64 {
        (self.offset as u64) << 32 | self.sublist as u64
    }

    #[inline(always)]
    pub fn from_bits(bits: u64) -> Self {
        Self {
            sublist: bits as Index,
            offset: (bits >> 32) as Index,
        }
    }
}

/// Walker output for one boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SublistMeta {
    /// Elements written by this worker, boundary included.
    pub size: Index,
    /// Boundary id reached at the end of the walk, or `NONE` if the walk ran
    /// into the list's terminal sentinel.
    pub next: Index,
}
