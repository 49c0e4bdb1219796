//! # Page Cursor
//!
//! Bounds-checked random access over one page buffer. The record format
//! stores metadata at negative offsets from the record origin, so decoding
//! needs a cursor that can seek and step backward as freely as it reads
//! forward. Every movement and read is validated against the page bounds.

use eyre::{ensure, Result};

#[derive(Debug)]
pub struct PageCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PageCursor<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Result<Self> {
        ensure!(
            pos <= data.len(),
            "cursor position {} beyond page end {}",
            pos,
            data.len()
        );
        Ok(Self { data, pos })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        ensure!(
            pos <= self.data.len(),
            "cursor position {} beyond page end {}",
            pos,
            self.data.len()
        );
        self.pos = pos;
        Ok(())
    }

    /// Moves the cursor backward.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        ensure!(self.pos >= n, "cursor rewind {} before page start", n);
        self.pos -= n;
        Ok(())
    }

    /// Moves the cursor forward without reading.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.set_position(self.pos + n)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        ensure!(self.pos + 1 <= self.data.len(), "read past page end");
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let bytes: [u8; 2] = self.read_bytes(2)?.try_into().unwrap();
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().unwrap();
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let bytes: [u8; 8] = self.read_bytes(8)?.try_into().unwrap();
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        ensure!(
            self.pos + n <= self.data.len(),
            "read of {} bytes at {} past page end {}",
            n,
            self.pos,
            self.data.len()
        );
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads the byte immediately before the cursor, leaving the cursor on
    /// it. This is the access pattern of the backward-growing length array.
    pub fn read_u8_backward(&mut self) -> Result<u8> {
        self.rewind(1)?;
        Ok(self.data[self.pos])
    }
}
