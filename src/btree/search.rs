//! # Page Search
//!
//! Key search within and below one INDEX page: binary search over the page
//! directory to land near the key, then a linear probe along the record
//! list. On non-leaf pages the probe picks the child to descend into and
//! recurses; on leaf pages it produces the final [`SearchOutcome`].
//!
//! ## Descent rule
//!
//! Walking a non-leaf page with `prev`/`curr` record pairs:
//!
//! - `curr.key == target` descends into `curr`'s child
//! - `curr.key > target` descends into `prev`'s child, except when `prev`
//!   is infimum: a target smaller than every separator on the page belongs
//!   to the subtree of the *first* real record, so descend into `curr`
//! - supremum reached: descend into the last real record's child

use std::cmp::Ordering;

use eyre::Result;

use crate::btree::navigator::TreeNavigator;
use crate::btree::IndexPage;
use crate::error::ReaderError;
use crate::record::{Record, RecordType};
use crate::storage::PageStore;
use crate::types::Value;

/// Result of a key search on a leaf page.
///
/// `Closest` is the negative hit: the key itself is absent and the wrapped
/// record is the smallest one ordered at or above it (possibly supremum).
/// It pins down the leaf page a range scan must start or end on without
/// pretending an exact match exists.
#[derive(Debug)]
pub enum SearchOutcome {
    Match(Record),
    Closest(Record),
}

impl SearchOutcome {
    /// The exact-match record, if any.
    pub fn into_match(self) -> Option<Record> {
        match self {
            SearchOutcome::Match(record) => Some(record),
            SearchOutcome::Closest(_) => None,
        }
    }

    /// The wrapped record, exact or closest.
    pub fn record(&self) -> &Record {
        match self {
            SearchOutcome::Match(record) | SearchOutcome::Closest(record) => record,
        }
    }
}

impl<S: PageStore> TreeNavigator<S> {
    /// Searches for `key` in the subtree rooted at `page`.
    pub(crate) fn search_page(
        &self,
        page: &IndexPage<'_>,
        key: &[Value],
    ) -> Result<SearchOutcome> {
        let decoder = self.decoder();
        let slots = page.directory_slots();

        let mut lo = 0isize;
        let mut hi = slots.len() as isize - 1;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let record = decoder.decode(
                page.data(),
                page.page_number(),
                page.is_leaf(),
                slots[mid as usize] as usize,
            )?;
            match self.compare_record_key(&record, key) {
                Ordering::Greater => hi = mid - 1,
                Ordering::Less => lo = mid + 1,
                Ordering::Equal => {
                    return self.linear_probe(page, slots[mid as usize] as usize, key)
                }
            }
        }

        // Slot 0 holds infimum, which orders below every key, so the search
        // always leaves a slot at lo-1.
        if lo < 1 {
            return Err(ReaderError::MalformedRecord(format!(
                "directory search fell off page {}",
                page.page_number()
            ))
            .into());
        }
        self.linear_probe(page, slots[(lo - 1) as usize] as usize, key)
    }

    /// Walks the record list from a directory slot until the key's position
    /// is pinned down.
    fn linear_probe(
        &self,
        page: &IndexPage<'_>,
        start_origin: usize,
        key: &[Value],
    ) -> Result<SearchOutcome> {
        let decoder = self.decoder();
        let is_leaf = page.is_leaf();
        let walk_cap = page.index_header().n_heap() as usize + 2;
        let mut walked = 0usize;

        let mut record = decoder.decode(page.data(), page.page_number(), is_leaf, start_origin)?;
        let mut prev: Option<Record> = None;

        while !record.is_supremum() {
            if walked >= walk_cap {
                return Err(ReaderError::MalformedRecord(format!(
                    "record list on page {} does not terminate",
                    page.page_number()
                ))
                .into());
            }
            walked += 1;

            match self.compare_record_key(&record, key) {
                Ordering::Less => {}
                Ordering::Equal => {
                    if is_leaf {
                        return Ok(SearchOutcome::Match(record));
                    }
                    let child = child_of(&record)?;
                    return self.descend(child, key);
                }
                Ordering::Greater => {
                    if is_leaf {
                        return Ok(SearchOutcome::Closest(record));
                    }
                    // Smaller than the smallest separator: the first real
                    // record's subtree covers the key.
                    let child = match &prev {
                        Some(p) if !p.is_infimum() => child_of(p)?,
                        _ => child_of(&record)?,
                    };
                    return self.descend(child, key);
                }
            }

            let next = decoder.decode(
                page.data(),
                page.page_number(),
                is_leaf,
                record.next_position(),
            )?;
            prev = Some(record);
            record = next;
        }

        if is_leaf {
            return Ok(SearchOutcome::Closest(record));
        }
        match &prev {
            Some(p) if !p.is_infimum() => {
                let child = child_of(p)?;
                self.descend(child, key)
            }
            _ => Err(ReaderError::MalformedRecord(format!(
                "non-leaf page {} has no records to descend through",
                page.page_number()
            ))
            .into()),
        }
    }

    fn descend(&self, child_page: u32, key: &[Value]) -> Result<SearchOutcome> {
        let page = self.load_index_page(child_page)?;
        self.search_page(&page, key)
    }

    /// System records bracket every key: infimum orders below and supremum
    /// above anything.
    fn compare_record_key(&self, record: &Record, key: &[Value]) -> Ordering {
        match record.record_type() {
            RecordType::Infimum => Ordering::Less,
            RecordType::Supremum => Ordering::Greater,
            _ => self.comparator().compare(record.primary_key(), key),
        }
    }
}

fn child_of(record: &Record) -> Result<u32> {
    record.child_page_number().ok_or_else(|| {
        ReaderError::MalformedRecord(format!(
            "node pointer at {} has no child page number",
            record.origin()
        ))
        .into()
    })
}
