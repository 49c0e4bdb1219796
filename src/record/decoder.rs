//! # Row Decoder
//!
//! Decodes one COMPACT/DYNAMIC record from page bytes into a [`Record`].
//! The decoder works on the page as a random-access buffer: record metadata
//! sits at negative offsets from the origin, so decoding first walks
//! backward (header, null bitmap, length array) and then forward through
//! the body.
//!
//! ## Variable-length lengths
//!
//! For each non-null variable-length column the header stores the on-page
//! length in one byte, or two when the first byte exceeds 127 *and* the
//! column can need them: BLOB/TEXT family columns always can, other columns
//! only when their maximum byte width exceeds 255. In the two-byte form bit
//! 6 of the first byte flags an externally stored column and bits 0-5 carry
//! the high bits of the 14-bit length.
//!
//! ## Externally stored columns
//!
//! The on-page bytes are a 768-byte prefix plus a 20-byte overflow pointer;
//! the rest of the value is assembled by walking the BLOB page chain. A
//! chain that leads into the newer LOB page format either aborts the decode
//! or yields a null value for the column, per [`ReaderConfig`].

use std::sync::Arc;

use eyre::{ensure, Result};
use smallvec::SmallVec;

use crate::config::{
    ReaderConfig, EXTERN_PREFIX_SIZE, FIL_HEADER_SIZE, FIL_TRAILER_SIZE, HIDDEN_LEAF_FIELDS_SIZE,
    OVERFLOW_POINTER_SIZE, PAGE_SIZE, RECORD_HEADER_SIZE, ROW_ID_SIZE,
};
use crate::error::ReaderError;
use crate::record::overflow::{BlobPage, OverflowPagePointer};
use crate::record::{PageCursor, Record, RecordHeader, RecordType};
use crate::schema::TableDef;
use crate::storage::{FilHeader, PageStore, PageType};
use crate::types::{parser, ColumnDef, Value};

/// Pending (length, externally-stored) entries for the record being decoded,
/// in record field order.
type VarLengths = SmallVec<[(usize, bool); 8]>;

pub struct RecordDecoder<'a, S: PageStore> {
    store: &'a S,
    table: &'a Arc<TableDef>,
    config: ReaderConfig,
}

impl<'a, S: PageStore> RecordDecoder<'a, S> {
    pub fn new(store: &'a S, table: &'a Arc<TableDef>, config: ReaderConfig) -> Self {
        Self {
            store,
            table,
            config,
        }
    }

    /// Decodes the record whose origin is at `origin` within `data`.
    pub fn decode(
        &self,
        data: &[u8],
        page_number: u32,
        is_leaf: bool,
        origin: usize,
    ) -> Result<Record> {
        ensure!(
            origin >= FIL_HEADER_SIZE + RECORD_HEADER_SIZE && origin < data.len(),
            "record origin {} outside page body",
            origin
        );

        let header_bytes: [u8; RECORD_HEADER_SIZE] = data
            [origin - RECORD_HEADER_SIZE..origin]
            .try_into()
            .unwrap();
        let header = RecordHeader::parse(&header_bytes)?;
        let next_position = next_record_position(origin, header.next_offset)?;

        let mut record = Record::new(
            header,
            Arc::clone(self.table),
            page_number,
            origin,
            next_position,
        );

        if matches!(
            header.record_type,
            RecordType::Infimum | RecordType::Supremum
        ) {
            return Ok(record);
        }

        let null_columns = self.read_null_bitmap(data, origin, is_leaf)?;
        let lengths = self.read_var_lengths(data, origin, is_leaf, &null_columns)?;
        let mut pending = lengths.iter().copied();

        let mut cursor = PageCursor::new(data, origin)?;
        let charset = self.table.charset();

        if self.table.has_user_primary_key() {
            for &pk_idx in self.table.primary_key() {
                let column = self.table.column(pk_idx);
                let value = if column.is_variable_length(charset) {
                    let (len, external) = pending.next().ok_or_else(|| {
                        ReaderError::SchemaMismatch(format!(
                            "no pending length for key column {:?}",
                            column.name()
                        ))
                    })?;
                    self.read_var_column(&mut cursor, column, len, external)?
                } else {
                    parser::read_fixed(&mut cursor, column, charset)?
                };
                record.push_key(value.clone());
                record.set_value(pk_idx, value);
            }
        } else {
            // Clustered on the hidden 6-byte row id; skipped, not exposed.
            cursor.skip(ROW_ID_SIZE)?;
        }

        if is_leaf {
            cursor.skip(HIDDEN_LEAF_FIELDS_SIZE)?;

            for (idx, column) in self.table.columns().iter().enumerate() {
                if self.table.is_primary_key(idx) {
                    continue;
                }
                if null_columns[idx] {
                    record.set_value(idx, Value::Null);
                } else if column.is_variable_length(charset) {
                    let (len, external) = pending.next().ok_or_else(|| {
                        ReaderError::SchemaMismatch(format!(
                            "no pending length for column {:?}",
                            column.name()
                        ))
                    })?;
                    let value = self.read_var_column(&mut cursor, column, len, external)?;
                    record.set_value(idx, value);
                } else {
                    record.set_value(idx, parser::read_fixed(&mut cursor, column, charset)?);
                }
            }
        } else {
            record.set_child_page_number(cursor.read_u32_be()?);
        }

        Ok(record)
    }

    /// Reads the null bitmap preceding the length array. Node-pointer
    /// records carry only non-nullable key columns and no bitmap bytes.
    fn read_null_bitmap(&self, data: &[u8], origin: usize, is_leaf: bool) -> Result<Vec<bool>> {
        let mut null_columns = vec![false; self.table.columns().len()];
        if !is_leaf || self.table.nullable_count() == 0 {
            return Ok(null_columns);
        }

        let base = origin - RECORD_HEADER_SIZE;
        ensure!(
            base >= self.table.null_bitmap_size() + FIL_HEADER_SIZE,
            "null bitmap runs out of the page body"
        );
        for (bit, &col_idx) in self.table.nullable_columns().iter().enumerate() {
            let byte = data[base - 1 - bit / 8];
            if byte >> (bit % 8) & 1 == 1 {
                null_columns[col_idx] = true;
            }
        }
        Ok(null_columns)
    }

    /// Walks the backward-growing length array, collecting one entry per
    /// non-null variable-length column in record field order.
    fn read_var_lengths(
        &self,
        data: &[u8],
        origin: usize,
        is_leaf: bool,
        null_columns: &[bool],
    ) -> Result<VarLengths> {
        let var_columns = if is_leaf {
            self.table.variable_length_columns()
        } else {
            self.table.primary_key_variable_length_columns()
        };

        let mut lengths = VarLengths::new();
        if var_columns.is_empty() {
            return Ok(lengths);
        }

        let null_bytes = if is_leaf {
            self.table.null_bitmap_size()
        } else {
            0
        };
        let mut pos = origin - RECORD_HEADER_SIZE - null_bytes;

        for &col_idx in var_columns {
            if null_columns[col_idx] {
                continue;
            }
            let column = self.table.column(col_idx);

            pos = checked_step_down(pos)?;
            let first = data[pos];
            if self.needs_two_bytes(column, first) {
                pos = checked_step_down(pos)?;
                let length = ((first as usize & 0x3F) << 8) | data[pos] as usize;
                let external = first & 0x40 != 0;
                lengths.push((length, external));
            } else {
                lengths.push((first as usize, false));
            }
        }
        Ok(lengths)
    }

    /// A second length byte follows iff the first exceeds 127 and the column
    /// can actually need it.
    fn needs_two_bytes(&self, column: &ColumnDef, first_byte: u8) -> bool {
        first_byte > 127
            && (column.column_type().is_blob_text()
                || column.max_byte_length(self.table.charset()) > 255)
    }

    fn read_var_column(
        &self,
        cursor: &mut PageCursor<'_>,
        column: &ColumnDef,
        length: usize,
        external: bool,
    ) -> Result<Value> {
        if external {
            return self.read_external(cursor, column, length);
        }
        if cursor.position() + length > PAGE_SIZE {
            return Err(ReaderError::MalformedRecord(format!(
                "declared length {} for column {:?} exceeds the page",
                length,
                column.name()
            ))
            .into());
        }
        parser::read_variable(cursor, column, length, self.table.charset())
    }

    /// Assembles an externally stored value: the 768-byte on-page prefix
    /// plus every chunk of the BLOB chain behind the overflow pointer.
    fn read_external(
        &self,
        cursor: &mut PageCursor<'_>,
        column: &ColumnDef,
        on_page_length: usize,
    ) -> Result<Value> {
        ensure!(
            on_page_length >= OVERFLOW_POINTER_SIZE,
            "externally stored column {:?} shorter than its pointer",
            column.name()
        );

        let prefix = if on_page_length > OVERFLOW_POINTER_SIZE {
            cursor.read_bytes(EXTERN_PREFIX_SIZE)?
        } else {
            &[]
        };
        let pointer = OverflowPagePointer::read(cursor)?;

        let mut assembled = Vec::with_capacity(prefix.len() + pointer.length as usize);
        assembled.extend_from_slice(prefix);

        let mut next = Some(pointer.page_number);
        while let Some(page_no) = next {
            let page = self.store.page(page_no)?;
            let fil = FilHeader::from_page(page)?;
            match fil.page_type() {
                PageType::Blob => {
                    let blob = BlobPage::parse(page, page_no)?;
                    assembled.extend_from_slice(blob.chunk());
                    next = blob.next_page();
                }
                PageType::LobFirst => {
                    if self.config.throw_on_unsupported_new_lob {
                        return Err(ReaderError::UnsupportedLobFormat { page_no }.into());
                    }
                    return Ok(Value::Null);
                }
                other => {
                    return Err(ReaderError::PageTypeMismatch {
                        page_no,
                        expected: "BLOB",
                        actual: other.code(),
                    }
                    .into())
                }
            }
        }

        parser::decode_bytes(column, &assembled, self.table.charset())
    }
}

/// Resolves the relative next-record offset into an absolute page position,
/// wrapping into page coordinates.
pub(crate) fn next_record_position(origin: usize, next_offset: i16) -> Result<usize> {
    let position = (origin as i64 + next_offset as i64).rem_euclid(PAGE_SIZE as i64) as usize;
    if position < FIL_HEADER_SIZE || position >= PAGE_SIZE - FIL_TRAILER_SIZE {
        return Err(ReaderError::MalformedRecord(format!(
            "next record position {} outside page body",
            position
        ))
        .into());
    }
    Ok(position)
}

fn checked_step_down(pos: usize) -> Result<usize> {
    if pos <= FIL_HEADER_SIZE {
        return Err(ReaderError::MalformedRecord(
            "length array runs out of the page body".to_string(),
        )
        .into());
    }
    Ok(pos - 1)
}
