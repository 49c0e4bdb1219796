//! # Index Page
//!
//! Wraps one INDEX page buffer and exposes its structure: the index header,
//! the infimum/supremum system records, the page directory, and the sibling
//! links. Construction validates the invariants every well-formed INDEX
//! page satisfies, so the rest of the crate can navigate without
//! re-checking.
//!
//! ## Index header layout (36 bytes at offset 38, big-endian)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  --------------------------------------------
//! 0       2     n_dir_slots    number of page directory slots
//! 2       2     heap_top       first free byte of the heap
//! 4       2     n_heap         heap records; bit 15 = compact format
//! 6       2     free           head of the deleted-record list
//! 8       2     garbage        bytes in deleted records
//! 10      2     last_insert    byte offset of the last insert
//! 12      2     direction      insert direction hint
//! 14      2     n_direction    inserts in that direction
//! 16      2     n_recs         user records on the page
//! 18      8     max_trx_id     updated on secondary indexes only
//! 26      2     level          0 = leaf
//! 28      8     index_id       dictionary id of this index
//! ```
//!
//! ## Page directory
//!
//! Two-byte big-endian record-origin offsets stored back-to-front from the
//! trailer: logical slot `i` lives at `PAGE_SIZE - 8 - 2*(i+1)`. Slot 0
//! always points at infimum and the last slot at supremum; each slot's
//! record owns up to eight predecessors in key order.

use eyre::Result;
use zerocopy::big_endian::{U16, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    DIR_SLOT_SIZE, FIL_HEADER_SIZE, FIL_TRAILER_SIZE, INDEX_HEADER_SIZE, INFIMUM_BODY,
    INFIMUM_OFFSET, PAGE_SIZE, SUPREMUM_BODY, SUPREMUM_OFFSET, SYSTEM_RECORD_BODY_SIZE,
    USER_RECORDS_OFFSET,
};
use crate::error::ReaderError;
use crate::storage::{FilHeader, PageType};

const COMPACT_FORMAT_FLAG: u16 = 0x8000;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IndexHeader {
    n_dir_slots: U16,
    heap_top: U16,
    n_heap: U16,
    free: U16,
    garbage: U16,
    last_insert: U16,
    direction: U16,
    n_direction: U16,
    n_recs: U16,
    max_trx_id: U64,
    level: U16,
    index_id: U64,
}

const _: () = assert!(std::mem::size_of::<IndexHeader>() == INDEX_HEADER_SIZE);

impl IndexHeader {
    be_getters! {
        n_dir_slots: u16,
        heap_top: u16,
        n_recs: u16,
        max_trx_id: u64,
        level: u16,
        index_id: u64,
    }

    /// Heap record count, including infimum and supremum.
    pub fn n_heap(&self) -> u16 {
        self.n_heap.get() & !COMPACT_FORMAT_FLAG
    }

    pub fn is_compact_format(&self) -> bool {
        self.n_heap.get() & COMPACT_FORMAT_FLAG != 0
    }
}

#[derive(Debug)]
pub struct IndexPage<'a> {
    data: &'a [u8],
    page_number: u32,
}

impl<'a> IndexPage<'a> {
    /// Validates and wraps an INDEX page buffer.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        eyre::ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );

        let fil = FilHeader::from_page(data)?;
        let page_number = fil.page_number();
        if fil.page_type() != PageType::Index {
            return Err(ReaderError::PageTypeMismatch {
                page_no: page_number,
                expected: "INDEX",
                actual: fil.page_type_code(),
            }
            .into());
        }

        let page = Self { data, page_number };

        if &data[INFIMUM_OFFSET..INFIMUM_OFFSET + SYSTEM_RECORD_BODY_SIZE] != INFIMUM_BODY {
            return Err(ReaderError::MalformedRecord(format!(
                "page {} infimum marker is corrupt",
                page_number
            ))
            .into());
        }
        if &data[SUPREMUM_OFFSET..SUPREMUM_OFFSET + SYSTEM_RECORD_BODY_SIZE] != SUPREMUM_BODY {
            return Err(ReaderError::MalformedRecord(format!(
                "page {} supremum marker is corrupt",
                page_number
            ))
            .into());
        }

        let n_slots = page.index_header().n_dir_slots() as usize;
        if n_slots < 2 || directory_start(n_slots) < USER_RECORDS_OFFSET {
            return Err(ReaderError::MalformedRecord(format!(
                "page {} directory slot count {} is invalid",
                page_number, n_slots
            ))
            .into());
        }
        let slots = page.directory_slots();
        if slots[0] as usize != INFIMUM_OFFSET || slots[n_slots - 1] as usize != SUPREMUM_OFFSET {
            return Err(ReaderError::MalformedRecord(format!(
                "page {} directory does not bracket the system records",
                page_number
            ))
            .into());
        }

        Ok(page)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn fil_header(&self) -> &'a FilHeader {
        FilHeader::from_page(self.data).expect("validated in parse")
    }

    pub fn index_header(&self) -> &'a IndexHeader {
        crate::storage::parse_zerocopy(&self.data[FIL_HEADER_SIZE..], "IndexHeader")
            .expect("validated in parse")
    }

    pub fn is_leaf(&self) -> bool {
        self.index_header().level() == 0
    }

    pub fn level(&self) -> u16 {
        self.index_header().level()
    }

    /// User records on this page, per the index header.
    pub fn n_user_records(&self) -> u16 {
        self.index_header().n_recs()
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.fil_header().prev_page()
    }

    pub fn next_page(&self) -> Option<u32> {
        self.fil_header().next_page()
    }

    pub fn infimum_origin(&self) -> usize {
        INFIMUM_OFFSET
    }

    pub fn supremum_origin(&self) -> usize {
        SUPREMUM_OFFSET
    }

    /// Directory slot values in logical order: slot 0 (infimum) first.
    pub fn directory_slots(&self) -> Vec<u16> {
        let n_slots = self.index_header().n_dir_slots() as usize;
        let mut slots = Vec::with_capacity(n_slots);
        for i in 0..n_slots {
            let at = PAGE_SIZE - FIL_TRAILER_SIZE - DIR_SLOT_SIZE * (i + 1);
            slots.push(u16::from_be_bytes([self.data[at], self.data[at + 1]]));
        }
        slots
    }
}

fn directory_start(n_slots: usize) -> usize {
    PAGE_SIZE - FIL_TRAILER_SIZE - DIR_SLOT_SIZE * n_slots
}
