//! # Tree Navigator
//!
//! Query entry points over one clustered index. The navigator descends from
//! the root page to the leaves, materializing records through the decoder:
//!
//! - [`TreeNavigator::point_lookup`]: directory binary search down to one
//!   record
//! - [`TreeNavigator::query_all`] / [`TreeNavigator::traverse_all`]:
//!   depth-first traversal of the whole tree
//! - [`TreeNavigator::range_iter`] / [`TreeNavigator::range_query`]: lazy
//!   scan along the leaf sibling chain between two bounds
//! - [`TreeNavigator::query_page`]: every record of one page
//!
//! All methods take `&self`; the navigator never mutates the store. The
//! only mutable state is a warning counter that records pages whose walked
//! record count disagreed with their index header (the chain is trusted).

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use eyre::Result;

use crate::btree::range::{ComparisonOp, Qualification, RangeBounds, RangeIterator};
use crate::btree::IndexPage;
use crate::config::{ReaderConfig, MAX_SDI_SKIPS, ROOT_PAGE_NUMBER, SUPREMUM_OFFSET};
use crate::error::ReaderError;
use crate::record::{Record, RecordDecoder};
use crate::schema::TableDef;
use crate::storage::{FilHeader, PageStore, PageType};
use crate::types::{KeyComparator, Value};

pub struct TreeNavigator<S: PageStore> {
    store: S,
    table: Arc<TableDef>,
    comparator: KeyComparator,
    config: ReaderConfig,
    mismatch_warnings: AtomicU64,
}

impl<S: PageStore> TreeNavigator<S> {
    pub fn new(store: S, table: Arc<TableDef>, config: ReaderConfig) -> Self {
        Self {
            store,
            table,
            comparator: KeyComparator::new(),
            config,
            mismatch_warnings: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    pub fn comparator(&self) -> &KeyComparator {
        &self.comparator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pages whose walked record count disagreed with their index header.
    pub fn mismatch_warnings(&self) -> u64 {
        self.mismatch_warnings.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn decoder(&self) -> RecordDecoder<'_, S> {
        RecordDecoder::new(&self.store, &self.table, self.config)
    }

    /// Loads a page and wraps it as an INDEX page, skipping over at most
    /// [`MAX_SDI_SKIPS`] serialized-dictionary pages by advancing the page
    /// number (they precede the root in files written by newer servers).
    pub fn load_index_page(&self, page_no: u32) -> Result<IndexPage<'_>> {
        let mut page_no = page_no;
        let mut skips = 0;
        loop {
            let data = self.store.page(page_no)?;
            let fil = FilHeader::from_page(data)?;
            if fil.page_type() == PageType::Sdi {
                if skips >= MAX_SDI_SKIPS {
                    return Err(ReaderError::PageTypeMismatch {
                        page_no,
                        expected: "INDEX",
                        actual: fil.page_type_code(),
                    }
                    .into());
                }
                skips += 1;
                page_no += 1;
                continue;
            }
            return IndexPage::parse(data);
        }
    }

    /// Looks up the record with exactly the given primary key, or `None`
    /// when the closest record is not an exact match.
    pub fn point_lookup(&self, key: &[Value]) -> Result<Option<Record>> {
        self.check_point_key(key)?;
        let root = self.load_index_page(ROOT_PAGE_NUMBER)?;
        Ok(self.search_page(&root, key)?.into_match())
    }

    /// All records of one page, leaf or not, in list order.
    pub fn query_page(&self, page_no: u32) -> Result<Vec<Record>> {
        let page = self.load_index_page(page_no)?;
        self.collect_page_records(&page, None)
    }

    /// Depth-first traversal of the whole tree, visiting every leaf record
    /// in ascending key order.
    pub fn traverse_all<F: FnMut(Record)>(&self, visit: &mut F) -> Result<()> {
        self.traverse_page(ROOT_PAGE_NUMBER, visit)
    }

    /// Collects every leaf record of the tree. On large tables prefer
    /// [`TreeNavigator::query_all_iter`], which holds one page at a time.
    pub fn query_all(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        self.traverse_all(&mut |record| records.push(record))?;
        Ok(records)
    }

    /// Iterator over the whole table along the leaf chain.
    pub fn query_all_iter(&self) -> Result<RangeIterator<'_, S>> {
        self.range_iter(vec![], ComparisonOp::Nop, vec![], ComparisonOp::Nop)
    }

    /// Lazy iterator over the records between `lower` and `upper`.
    pub fn range_iter(
        &self,
        lower: Vec<Value>,
        lower_op: ComparisonOp,
        upper: Vec<Value>,
        upper_op: ComparisonOp,
    ) -> Result<RangeIterator<'_, S>> {
        let bounds = RangeBounds::new(
            &self.table,
            &self.comparator,
            lower,
            lower_op,
            upper,
            upper_op,
        )?;
        Ok(RangeIterator::new(self, bounds))
    }

    /// Collects the records between `lower` and `upper`. Fully open bounds
    /// fall back to the depth-first bulk read.
    pub fn range_query(
        &self,
        lower: Vec<Value>,
        lower_op: ComparisonOp,
        upper: Vec<Value>,
        upper_op: ComparisonOp,
    ) -> Result<Vec<Record>> {
        if lower.is_empty() && upper.is_empty() {
            // validate the operator pairing even on the shortcut path
            RangeBounds::new(
                &self.table,
                &self.comparator,
                lower,
                lower_op,
                upper,
                upper_op,
            )?;
            return self.query_all();
        }
        self.range_iter(lower, lower_op, upper, upper_op)?
            .collect()
    }

    /// Resolves the leaf pages holding the closest records for both bounds.
    pub(crate) fn range_bounds(&self, lower: &[Value], upper: &[Value]) -> Result<(u32, u32)> {
        let root = self.load_index_page(ROOT_PAGE_NUMBER)?;
        let start = self.search_page(&root, lower)?;
        let root = self.load_index_page(ROOT_PAGE_NUMBER)?;
        let end = self.search_page(&root, upper)?;
        Ok((start.record().page_number(), end.record().page_number()))
    }

    fn traverse_page<F: FnMut(Record)>(&self, page_no: u32, visit: &mut F) -> Result<()> {
        let page = self.load_index_page(page_no)?;
        let records = self.collect_page_records(&page, None)?;
        for record in records {
            if record.is_leaf_record() {
                visit(record);
            } else if let Some(child) = record.child_page_number() {
                self.traverse_page(child, visit)?;
            }
        }
        Ok(())
    }

    /// Walks the record list from infimum to supremum, decoding each user
    /// record. With bounds, records are filtered (and an upper-only scan
    /// stops at the first key past the bound). The walk is capped by the
    /// page's heap count so a corrupt next-pointer loop cannot spin
    /// forever; a count that disagrees with the index header is recorded as
    /// a warning, the chain itself is trusted.
    pub(crate) fn collect_page_records(
        &self,
        page: &IndexPage<'_>,
        bounds: Option<&RangeBounds>,
    ) -> Result<Vec<Record>> {
        let decoder = self.decoder();
        let data = page.data();
        let page_no = page.page_number();
        let is_leaf = page.is_leaf();

        let infimum = decoder.decode(data, page_no, is_leaf, page.infimum_origin())?;
        let mut position = infimum.next_position();
        let walk_cap = page.index_header().n_heap() as usize + 2;

        let mut records = Vec::with_capacity(page.n_user_records() as usize);
        let mut walked = 0usize;
        let mut stopped = false;

        while position != SUPREMUM_OFFSET {
            if walked >= walk_cap {
                return Err(ReaderError::MalformedRecord(format!(
                    "record list on page {} does not terminate",
                    page_no
                ))
                .into());
            }
            let record = decoder.decode(data, page_no, is_leaf, position)?;
            position = record.next_position();
            walked += 1;

            match bounds {
                None => records.push(record),
                Some(bounds) => {
                    match bounds.evaluate(&self.comparator, record.primary_key()) {
                        Qualification::Qualify => records.push(record),
                        Qualification::Skip => {}
                        Qualification::Stop => {
                            stopped = true;
                            break;
                        }
                    }
                }
            }
        }

        if !stopped && walked != page.n_user_records() as usize {
            self.mismatch_warnings
                .fetch_add(1, AtomicOrdering::Relaxed);
        }
        Ok(records)
    }

    fn check_point_key(&self, key: &[Value]) -> Result<()> {
        if !self.table.has_user_primary_key() {
            return Err(ReaderError::InvalidArgument(format!(
                "table {} is clustered on a hidden row id and cannot be key-queried",
                self.table.name()
            ))
            .into());
        }
        if key.is_empty() {
            return Err(
                ReaderError::InvalidArgument("search key must not be empty".to_string()).into(),
            );
        }
        if key.len() != self.table.primary_key_len() {
            return Err(ReaderError::InvalidArgument(format!(
                "search key has {} elements, primary key has {}",
                key.len(),
                self.table.primary_key_len()
            ))
            .into());
        }
        if key.iter().any(Value::is_null) {
            return Err(ReaderError::InvalidArgument(
                "search key must not contain null elements".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
