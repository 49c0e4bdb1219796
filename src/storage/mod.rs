//! # Storage Layer
//!
//! Page-granular access to a tablespace file. The reader treats the file as
//! an ordered collection of fixed 16 KiB pages; everything above this module
//! addresses pages by number and never touches file offsets.
//!
//! ## Module organization
//!
//! - [`fil`]: the FIL header/trailer present on every page, and page types
//! - [`mmap`]: `MmapPageStore`, the memory-mapped implementation
//!
//! The [`PageStore`] trait is the seam between the query core and I/O: any
//! implementation that can hand out consistent page slices works, which is
//! what the in-memory stores in the test suite rely on.

mod fil;
mod mmap;

pub use fil::{FilHeader, FilTrailer, PageType};
pub use mmap::MmapPageStore;

use eyre::{ensure, Result};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Source of tablespace pages.
///
/// `page` must be idempotent: repeated loads of the same page number during
/// one query must observe the same bytes, as if reading a single frozen
/// snapshot of the file.
pub trait PageStore {
    fn page(&self, page_no: u32) -> Result<&[u8]>;
}

impl<S: PageStore + ?Sized> PageStore for &S {
    fn page(&self, page_no: u32) -> Result<&[u8]> {
        (**self).page(page_no)
    }
}

/// Parses a zerocopy struct from the start of a byte slice with size
/// validation.
#[inline]
pub(crate) fn parse_zerocopy<'a, T: FromBytes + KnownLayout + Immutable>(
    bytes: &'a [u8],
    type_name: &str,
) -> Result<&'a T> {
    let size = std::mem::size_of::<T>();
    ensure!(
        bytes.len() >= size,
        "buffer too small for {}: {} < {}",
        type_name,
        bytes.len(),
        size
    );
    T::ref_from_bytes(&bytes[..size])
        .map_err(|e| eyre::eyre!("failed to parse {}: {:?}", type_name, e))
}
