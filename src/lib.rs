//! Parallel list ranking (Helman-Jaja style sublist ranking).
//!
//! Given an implicit singly linked list (`next` array + `head`) compute every
//! element's distance from the head:
//!  * pack    – materialise the working buffer from `next`
//!  * walk    – k workers, one per boundary element, stamp (sublist, offset)
//!  * reduce  – prefix sum of sublist sizes in chain order (k entries)
//!  * combine – rank = base offset of the sublist + local offset
//!
//! The walk reads successors from the immutable input and writes to a
//! separate buffer; it never re-reads what it wrote, so no load has to wait
//! for the previous store. Workers share nothing but that buffer and never
//! write the same slot, provided the input is a single list (unchecked
//! unless `RankOptions::validate` is set).
//!
//! ```
//! use listrank::{LinkedList, NONE, RankOptions, rank_list};
//!
//! // 2 -> 0 -> 3 -> 1 -> 4
//! let list = LinkedList::new(vec![3, 4, 0, 1, NONE], 2);
//! let opts = RankOptions { sublists: Some(2), ..Default::default() };
//! assert_eq!(rank_list(&list, &opts).unwrap(), vec![1, 3, 0, 2, 4]);
//! ```

pub mod boundary;
pub mod combine;
pub mod generate;
pub mod io;
pub mod list;
pub mod rank;
pub mod reduce;
pub mod validate;
pub mod walk;

#[cfg(feature = "gpu")]
pub mod rank_cu;

pub use generate::{random_list, sequential_list};
pub use list::{Index, LinkedList, MAX_LEN, NONE, Slot, SublistMeta};
pub use rank::{RankOptions, rank_list, rank_list_into, suggested_sublists};
pub use reduce::{PointerJumpReducer, Reducer, ReducerKind, SequentialReducer};
pub use validate::{check_ranks, validate_list};
pub use walk::WalkMode;
