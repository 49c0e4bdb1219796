//! # Memory-Mapped Page Store
//!
//! `MmapPageStore` maps a tablespace file read-only and serves 16 KiB page
//! slices straight out of the mapping. The file is assumed quiescent: no
//! server is writing while the reader is open, so a single mapping is a
//! consistent snapshot.
//!
//! Page access is O(1) pointer arithmetic; the OS page cache does the rest.
//! Because `page()` borrows `&self` immutably and the store is never grown,
//! returned slices stay valid for the life of the store.

use std::fs::File;
use std::path::Path;

use eyre::{ensure, Context, Result};
use memmap2::Mmap;

use crate::config::PAGE_SIZE;
use crate::storage::PageStore;

#[derive(Debug)]
pub struct MmapPageStore {
    mmap: Mmap,
    page_count: u32,
}

impl MmapPageStore {
    /// Maps an existing tablespace file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open tablespace file {}", path.display()))?;
        let len = file.metadata()?.len();

        ensure!(len > 0, "tablespace file {} is empty", path.display());
        ensure!(
            len % PAGE_SIZE as u64 == 0,
            "tablespace file {} length {} is not a multiple of the page size {}",
            path.display(),
            len,
            PAGE_SIZE
        );

        let mmap = unsafe { Mmap::map(&file) }
            .wrap_err_with(|| format!("failed to mmap {}", path.display()))?;

        Ok(Self {
            mmap,
            page_count: (len / PAGE_SIZE as u64) as u32,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

impl PageStore for MmapPageStore {
    fn page(&self, page_no: u32) -> Result<&[u8]> {
        ensure!(
            page_no < self.page_count,
            "page {} out of bounds (page_count={})",
            page_no,
            self.page_count
        );
        let start = page_no as usize * PAGE_SIZE;
        Ok(&self.mmap[start..start + PAGE_SIZE])
    }
}
