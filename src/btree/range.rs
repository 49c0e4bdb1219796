//! # Range Queries
//!
//! Comparison operators, bound validation, and the lazy [`RangeIterator`].
//!
//! ## Operators and bounds
//!
//! A range query carries a lower and an upper bound, each a composite key
//! paired with an operator. `Nop` encodes "no bound" and must be paired
//! with an empty key; a non-empty key must carry a real operator. All
//! argument problems are reported before any page is loaded.
//!
//! ## Iteration
//!
//! The iterator walks the leaf level from the page holding the closest
//! lower-bound record to the page holding the closest upper-bound record.
//! The first and last pages are filtered by the bound predicates; pages
//! strictly between them belong entirely to the range and are emitted
//! unfiltered. Nothing is loaded until the first `next()` call, so
//! constructing an iterator for an empty range costs nothing and a large
//! scan can be abandoned at any point.

use std::cmp::Ordering;

use eyre::Result;

use crate::btree::navigator::TreeNavigator;
use crate::error::ReaderError;
use crate::record::Record;
use crate::schema::TableDef;
use crate::storage::PageStore;
use crate::types::{max_key, min_key, KeyComparator, Value};

/// Bound operators. `Nop` means "no bound on this side".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Nop,
}

/// How a record's key relates to the active bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Qualification {
    /// Inside the range.
    Qualify,
    /// Outside the range, keep scanning.
    Skip,
    /// Outside the range and no later record can re-enter it.
    Stop,
}

/// A validated pair of range bounds. Either side may be absent.
#[derive(Debug, Clone)]
pub(crate) struct RangeBounds {
    pub lower: Vec<Value>,
    pub lower_op: ComparisonOp,
    pub upper: Vec<Value>,
    pub upper_op: ComparisonOp,
}

impl RangeBounds {
    /// Validates bounds against the table's key shape. Every failure is
    /// `InvalidArgument`, raised before any I/O happens.
    pub fn new(
        table: &TableDef,
        comparator: &KeyComparator,
        lower: Vec<Value>,
        lower_op: ComparisonOp,
        upper: Vec<Value>,
        upper_op: ComparisonOp,
    ) -> Result<Self> {
        if !table.has_user_primary_key() {
            return Err(ReaderError::InvalidArgument(format!(
                "table {} is clustered on a hidden row id and cannot be key-queried",
                table.name()
            ))
            .into());
        }
        check_side(table, &lower, lower_op, "lower", &[ComparisonOp::Gt, ComparisonOp::Gte])?;
        check_side(table, &upper, upper_op, "upper", &[ComparisonOp::Lt, ComparisonOp::Lte])?;

        if !lower.is_empty() && !upper.is_empty() {
            if comparator.compare(&lower, &upper) == Ordering::Greater {
                return Err(ReaderError::InvalidArgument(
                    "lower bound is greater than upper bound".to_string(),
                )
                .into());
            }
        }

        Ok(Self {
            lower,
            lower_op,
            upper,
            upper_op,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_empty() && self.upper.is_empty()
    }

    fn lower_qualified(&self, comparator: &KeyComparator, key: &[Value]) -> bool {
        match self.lower_op {
            ComparisonOp::Gt => comparator.compare(key, &self.lower) == Ordering::Greater,
            ComparisonOp::Gte => comparator.compare(key, &self.lower) != Ordering::Less,
            _ => unreachable!("validated lower operator"),
        }
    }

    fn upper_qualified(&self, comparator: &KeyComparator, key: &[Value]) -> bool {
        match self.upper_op {
            ComparisonOp::Lt => comparator.compare(key, &self.upper) == Ordering::Less,
            ComparisonOp::Lte => comparator.compare(key, &self.upper) != Ordering::Greater,
            _ => unreachable!("validated upper operator"),
        }
    }

    /// Evaluates one key against the bounds. Keys arrive in ascending
    /// order, so once the upper side fails on an upper-only scan, no later
    /// key can qualify and the scan stops.
    pub fn evaluate(&self, comparator: &KeyComparator, key: &[Value]) -> Qualification {
        match (self.lower.is_empty(), self.upper.is_empty()) {
            (false, false) => {
                if self.lower_qualified(comparator, key) && self.upper_qualified(comparator, key) {
                    Qualification::Qualify
                } else {
                    Qualification::Skip
                }
            }
            (false, true) => {
                if self.lower_qualified(comparator, key) {
                    Qualification::Qualify
                } else {
                    Qualification::Skip
                }
            }
            (true, false) => {
                if self.upper_qualified(comparator, key) {
                    Qualification::Qualify
                } else {
                    Qualification::Stop
                }
            }
            (true, true) => Qualification::Qualify,
        }
    }
}

fn check_side(
    table: &TableDef,
    key: &[Value],
    op: ComparisonOp,
    side: &str,
    allowed: &[ComparisonOp],
) -> Result<()> {
    if key.is_empty() {
        if op != ComparisonOp::Nop {
            return Err(ReaderError::InvalidArgument(format!(
                "{} operator {:?} requires a non-empty key",
                side, op
            ))
            .into());
        }
        return Ok(());
    }

    if op == ComparisonOp::Nop {
        return Err(ReaderError::InvalidArgument(format!(
            "{} key must be empty when the operator is Nop",
            side
        ))
        .into());
    }
    if !allowed.contains(&op) {
        return Err(ReaderError::InvalidArgument(format!(
            "operator {:?} is not valid for the {} bound",
            op, side
        ))
        .into());
    }
    if key.len() != table.primary_key_len() {
        return Err(ReaderError::InvalidArgument(format!(
            "{} key has {} elements, primary key has {}",
            side,
            key.len(),
            table.primary_key_len()
        ))
        .into());
    }
    if key.iter().any(Value::is_null) {
        return Err(ReaderError::InvalidArgument(format!(
            "{} key must not contain null elements",
            side
        ))
        .into());
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum IterState {
    /// Nothing loaded yet.
    Pending,
    /// Walking the leaf chain.
    Scanning {
        current_page: u32,
        end_page: u32,
        next_page: Option<u32>,
    },
    Finished,
}

/// Lazy cursor over the leaf pages covering a key range. Yields records in
/// ascending primary-key order; each record owns its values.
pub struct RangeIterator<'a, S: PageStore> {
    navigator: &'a TreeNavigator<S>,
    bounds: RangeBounds,
    buffer: std::vec::IntoIter<Record>,
    state: IterState,
}

impl<'a, S: PageStore> RangeIterator<'a, S> {
    pub(crate) fn new(navigator: &'a TreeNavigator<S>, bounds: RangeBounds) -> Self {
        Self {
            navigator,
            bounds,
            buffer: Vec::new().into_iter(),
            state: IterState::Pending,
        }
    }

    /// Loads the first page. Handles the degenerate equal-bound ranges
    /// without touching the leaf chain.
    fn init(&mut self) -> Result<()> {
        let nav = self.navigator;
        let comparator = nav.comparator();

        if !self.bounds.lower.is_empty()
            && !self.bounds.upper.is_empty()
            && comparator.compare(&self.bounds.lower, &self.bounds.upper) == Ordering::Equal
        {
            if self.bounds.lower_op == ComparisonOp::Gt && self.bounds.upper_op == ComparisonOp::Lt
            {
                self.state = IterState::Finished;
                return Ok(());
            }
            let record = nav.point_lookup(&self.bounds.lower)?;
            self.buffer = record.into_iter().collect::<Vec<_>>().into_iter();
            self.state = IterState::Finished;
            return Ok(());
        }

        let arity = nav.table().primary_key_len();
        let nav_lower = if self.bounds.lower.is_empty() {
            min_key(arity)
        } else {
            self.bounds.lower.clone()
        };
        let nav_upper = if self.bounds.upper.is_empty() {
            max_key(arity)
        } else {
            self.bounds.upper.clone()
        };

        let (start_page, end_page) = nav.range_bounds(&nav_lower, &nav_upper)?;
        let page = nav.load_index_page(start_page)?;
        let records = nav.collect_page_records(&page, Some(&self.bounds))?;
        let next_page = page.next_page();
        self.buffer = records.into_iter();
        self.state = IterState::Scanning {
            current_page: start_page,
            end_page,
            next_page,
        };
        Ok(())
    }

    /// Moves to the next leaf page. Returns false once the end page has
    /// been consumed.
    fn advance(&mut self) -> Result<bool> {
        let IterState::Scanning {
            current_page,
            end_page,
            next_page,
        } = self.state
        else {
            return Ok(false);
        };

        if current_page == end_page {
            self.state = IterState::Finished;
            return Ok(false);
        }
        let Some(page_no) = next_page else {
            return Err(ReaderError::MalformedRecord(format!(
                "leaf chain ended at page {} before reaching page {}",
                current_page, end_page
            ))
            .into());
        };

        let nav = self.navigator;
        let page = nav.load_index_page(page_no)?;
        // Interior pages belong entirely to the range; only the end page
        // needs the bound predicates again.
        let filter = if page_no == end_page {
            Some(&self.bounds)
        } else {
            None
        };
        let records = nav.collect_page_records(&page, filter)?;
        self.state = IterState::Scanning {
            current_page: page_no,
            end_page,
            next_page: page.next_page(),
        };
        self.buffer = records.into_iter();
        Ok(true)
    }
}

impl<'a, S: PageStore> Iterator for RangeIterator<'a, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, IterState::Pending) {
            if let Err(err) = self.init() {
                self.state = IterState::Finished;
                self.buffer = Vec::new().into_iter();
                return Some(Err(err));
            }
        }

        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            match self.advance() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.state = IterState::Finished;
                    return Some(Err(err));
                }
            }
        }
    }
}
