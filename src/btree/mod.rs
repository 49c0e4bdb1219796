//! # Clustered Index Navigation
//!
//! This module implements the read path over the clustered-index B+ tree
//! stored in a tablespace file.
//!
//! ## Tree shape
//!
//! Every page of the index is an INDEX page. Non-leaf pages hold
//! node-pointer records (key prefix + child page number); leaf pages hold
//! the full rows. Pages at the same level form a doubly linked list through
//! their FIL headers, which is what range scans ride along:
//!
//! ```text
//!                   [root, level 2]
//!                   /      |      \
//!        [level 1]    [level 1]    [level 1]
//!        /   |   \     ...
//! [leaf]<->[leaf]<->[leaf]<->[leaf]      (sibling chain)
//! ```
//!
//! ## In-page search
//!
//! Within a page, records form a singly linked list from infimum to
//! supremum in ascending key order. The page directory is a sparse array of
//! record offsets over that list: binary search over the directory lands
//! within eight records of the key, and a linear probe finishes the job.
//!
//! ## Module organization
//!
//! - [`index_page`]: page wrapper, index header, directory slots
//! - [`search`]: directory binary search + linear probe, [`SearchOutcome`]
//! - [`navigator`]: [`TreeNavigator`], the query entry points
//! - [`range`]: operators, bound validation, [`RangeIterator`]
//!
//! ## Memory behavior
//!
//! Pages are borrowed from the [`crate::storage::PageStore`] only while
//! being decoded; every record handed out owns its values. A range scan
//! keeps at most one page's worth of decoded records buffered.

mod index_page;
mod navigator;
mod range;
mod search;

pub use index_page::{IndexHeader, IndexPage};
pub use navigator::TreeNavigator;
pub use range::{ComparisonOp, RangeIterator};
pub use search::SearchOutcome;
