//! # FIL Header and Trailer
//!
//! Every page begins with a 38-byte FIL header and ends with an 8-byte
//! trailer. The header carries the page number, the page type, and the
//! previous/next page numbers at the same B+ tree level; the trailer repeats
//! checksum material this reader does not verify.
//!
//! ## Header layout (38 bytes, all big-endian)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ------------------------------
//! 0       4     checksum
//! 4       4     page_number
//! 8       4     prev_page   (FIL_NULL = none)
//! 12      4     next_page   (FIL_NULL = none)
//! 16      8     lsn
//! 24      2     page_type
//! 26      8     flush_lsn
//! 34      4     space_id
//! ```

use eyre::Result;
use zerocopy::big_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{FIL_HEADER_SIZE, FIL_NULL, FIL_TRAILER_SIZE};

/// Page type codes this reader recognizes; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Allocated,
    Index,
    Blob,
    Sdi,
    LobFirst,
    Other(u16),
}

impl PageType {
    pub const ALLOCATED: u16 = 0x0000;
    pub const BLOB: u16 = 0x000A;
    pub const LOB_FIRST: u16 = 0x0018;
    pub const SDI: u16 = 0x45BD;
    pub const INDEX: u16 = 0x45BF;

    pub fn from_code(code: u16) -> Self {
        match code {
            Self::ALLOCATED => PageType::Allocated,
            Self::INDEX => PageType::Index,
            Self::BLOB => PageType::Blob,
            Self::SDI => PageType::Sdi,
            Self::LOB_FIRST => PageType::LobFirst,
            other => PageType::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            PageType::Allocated => Self::ALLOCATED,
            PageType::Index => Self::INDEX,
            PageType::Blob => Self::BLOB,
            PageType::Sdi => Self::SDI,
            PageType::LobFirst => Self::LOB_FIRST,
            PageType::Other(code) => code,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FilHeader {
    checksum: U32,
    page_number: U32,
    prev_page: U32,
    next_page: U32,
    lsn: U64,
    page_type: U16,
    flush_lsn: U64,
    space_id: U32,
}

const _: () = assert!(std::mem::size_of::<FilHeader>() == FIL_HEADER_SIZE);

impl FilHeader {
    pub fn from_page(data: &[u8]) -> Result<&Self> {
        crate::storage::parse_zerocopy(data, "FilHeader")
    }

    be_getters! {
        checksum: u32,
        page_number: u32,
        lsn: u64,
        flush_lsn: u64,
        space_id: u32,
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_code(self.page_type.get())
    }

    pub fn page_type_code(&self) -> u16 {
        self.page_type.get()
    }

    /// Previous page at the same tree level, if any.
    pub fn prev_page(&self) -> Option<u32> {
        match self.prev_page.get() {
            FIL_NULL => None,
            page => Some(page),
        }
    }

    /// Next page at the same tree level, if any.
    pub fn next_page(&self) -> Option<u32> {
        match self.next_page.get() {
            FIL_NULL => None,
            page => Some(page),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FilTrailer {
    checksum: U32,
    lsn_low: U32,
}

const _: () = assert!(std::mem::size_of::<FilTrailer>() == FIL_TRAILER_SIZE);

impl FilTrailer {
    be_getters! {
        checksum: u32,
        lsn_low: u32,
    }
}
