//! Shared test fixtures: an in-memory page store and a tablespace image
//! builder that encodes byte-exact INDEX, BLOB, and stub pages.
//!
//! The builder is the mirror image of the crate's decoder: records are laid
//! out with their backward-growing metadata (length array, null bitmap,
//! header), chained through next-record offsets, grouped under directory
//! slots owning at most eight records, and packed into leaves linked along
//! the sibling chain. Multi-level trees are built bottom-up with
//! node-pointer records until a single page fits, which is written at the
//! root page number.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use eyre::{ensure, Result};
use ibread::config::{
    BLOB_DATA_OFFSET, BLOB_LENGTH_OFFSET, BLOB_MAX_DATA_SIZE, BLOB_NEXT_PAGE_OFFSET,
    DIR_SLOT_SIZE, EXTERN_PREFIX_SIZE, FIL_HEADER_SIZE, FIL_NULL, FIL_TRAILER_SIZE,
    INFIMUM_BODY, INFIMUM_OFFSET, PAGE_SIZE, RECORD_HEADER_SIZE, ROOT_PAGE_NUMBER,
    SUPREMUM_BODY, SUPREMUM_OFFSET, USER_RECORDS_OFFSET,
};
use ibread::{Charset, ColumnDef, ColumnType, PageStore, TableDef, Value};

pub const PAGE_TYPE_INDEX: u16 = 0x45BF;
pub const PAGE_TYPE_BLOB: u16 = 0x000A;
pub const PAGE_TYPE_SDI: u16 = 0x45BD;
pub const PAGE_TYPE_LOB_FIRST: u16 = 0x0018;

const MIN_REC_FLAG: u8 = 0x10;
const DELETE_MARK_FLAG: u8 = 0x20;

/// In-memory page store over a built tablespace image.
pub struct MemPageStore {
    pub pages: Vec<Vec<u8>>,
}

impl MemPageStore {
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Writes the image as a contiguous file for mmap-based tests.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut image = Vec::with_capacity(self.pages.len() * PAGE_SIZE);
        for page in &self.pages {
            image.extend_from_slice(page);
        }
        std::fs::write(path, image)?;
        Ok(())
    }

    /// Overwrites one page's FIL page type, for corruption tests.
    pub fn set_page_type(&mut self, page_no: u32, page_type: u16) {
        self.pages[page_no as usize][24..26].copy_from_slice(&page_type.to_be_bytes());
    }
}

impl PageStore for MemPageStore {
    fn page(&self, page_no: u32) -> Result<&[u8]> {
        ensure!(
            (page_no as usize) < self.pages.len(),
            "page {} out of bounds",
            page_no
        );
        Ok(&self.pages[page_no as usize])
    }
}

/// One encoded record, not yet placed on a page. `meta` holds the length
/// array and null bitmap in ascending address order (ending adjacent to the
/// record header); `body` starts at the record origin.
struct EncodedRecord {
    meta: Vec<u8>,
    body: Vec<u8>,
    key: Vec<Value>,
    row_id: u64,
    delete_marked: bool,
}

impl EncodedRecord {
    fn page_cost(&self) -> usize {
        self.meta.len() + RECORD_HEADER_SIZE + self.body.len() + DIR_SLOT_SIZE
    }
}

pub struct FixtureBuilder {
    table: Arc<TableDef>,
    rows: Vec<Vec<Value>>,
    delete_marked_rows: Vec<usize>,
    rows_per_leaf: Option<usize>,
    pointers_per_node: Option<usize>,
    overflow_threshold: usize,
    blob_chunk_size: usize,
    sdi_pages: usize,
    pages: Vec<Vec<u8>>,
}

impl FixtureBuilder {
    pub fn new(table: Arc<TableDef>) -> Self {
        Self {
            table,
            rows: Vec::new(),
            delete_marked_rows: Vec::new(),
            rows_per_leaf: None,
            pointers_per_node: None,
            overflow_threshold: usize::MAX,
            blob_chunk_size: BLOB_MAX_DATA_SIZE,
            sdi_pages: 0,
            pages: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> &mut Self {
        assert_eq!(row.len(), self.table.columns().len(), "row arity");
        self.rows.push(row);
        self
    }

    pub fn push_rows(&mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> &mut Self {
        for row in rows {
            self.push_row(row);
        }
        self
    }

    /// Marks the most recently pushed row delete-marked.
    pub fn delete_mark_last(&mut self) -> &mut Self {
        self.delete_marked_rows.push(self.rows.len() - 1);
        self
    }

    /// Caps records per leaf page, forcing wider trees.
    pub fn rows_per_leaf(&mut self, n: usize) -> &mut Self {
        self.rows_per_leaf = Some(n);
        self
    }

    /// Caps node pointers per non-leaf page, forcing deeper trees.
    pub fn pointers_per_node(&mut self, n: usize) -> &mut Self {
        self.pointers_per_node = Some(n);
        self
    }

    /// Variable-length values longer than this go to overflow pages.
    pub fn overflow_threshold(&mut self, bytes: usize) -> &mut Self {
        self.overflow_threshold = bytes;
        self
    }

    pub fn blob_chunk_size(&mut self, bytes: usize) -> &mut Self {
        self.blob_chunk_size = bytes;
        self
    }

    /// Inserts SDI pages in front of the root, as newer servers do.
    pub fn sdi_pages(&mut self, n: usize) -> &mut Self {
        self.sdi_pages = n;
        self
    }

    pub fn build(&mut self) -> MemPageStore {
        self.pages.clear();
        for page_no in 0..ROOT_PAGE_NUMBER {
            self.pages.push(stub_page(page_no, 0x0008));
        }
        for i in 0..self.sdi_pages {
            self.pages
                .push(stub_page(ROOT_PAGE_NUMBER + i as u32, PAGE_TYPE_SDI));
        }
        let root_index = self.pages.len();
        self.pages.push(Vec::new());

        let rows = std::mem::take(&mut self.rows);
        let mut records: Vec<EncodedRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut rec = self.encode_record(row, true, None, i as u64 + 1);
                rec.delete_marked = self.delete_marked_rows.contains(&i);
                rec
            })
            .collect();
        self.rows = rows;

        let mut level = 0u16;
        loop {
            let cap = if level == 0 {
                self.rows_per_leaf
            } else {
                self.pointers_per_node
            };
            let groups = partition(records, cap);

            if groups.len() == 1 {
                let page = self.assemble_index_page(
                    root_index as u32,
                    &groups[0],
                    level,
                    level > 0,
                );
                self.pages[root_index] = page;
                break;
            }

            let numbers: Vec<u32> = groups
                .iter()
                .map(|_| {
                    self.pages.push(Vec::new());
                    (self.pages.len() - 1) as u32
                })
                .collect();
            for (i, (group, &page_no)) in groups.iter().zip(&numbers).enumerate() {
                let page =
                    self.assemble_index_page(page_no, group, level, level > 0 && i == 0);
                self.pages[page_no as usize] = page;
            }
            for (i, &page_no) in numbers.iter().enumerate() {
                let prev = if i > 0 { numbers[i - 1] } else { FIL_NULL };
                let next = if i + 1 < numbers.len() {
                    numbers[i + 1]
                } else {
                    FIL_NULL
                };
                let page = &mut self.pages[page_no as usize];
                page[8..12].copy_from_slice(&prev.to_be_bytes());
                page[12..16].copy_from_slice(&next.to_be_bytes());
            }

            records = groups
                .iter()
                .zip(&numbers)
                .map(|(group, &page_no)| {
                    let first = &group[0];
                    let row = self.node_pointer_row(&first.key);
                    let mut rec = self.encode_record(&row, false, Some(page_no), first.row_id);
                    rec.key = first.key.clone();
                    rec.row_id = first.row_id;
                    rec
                })
                .collect();
            level += 1;
        }

        MemPageStore {
            pages: std::mem::take(&mut self.pages),
        }
    }

    /// A full-width row carrying only the key columns, for node pointers.
    fn node_pointer_row(&self, key: &[Value]) -> Vec<Value> {
        let mut row = vec![Value::Null; self.table.columns().len()];
        for (k, &pk_idx) in self.table.primary_key().iter().enumerate() {
            row[pk_idx] = key[k].clone();
        }
        row
    }

    fn encode_record(
        &mut self,
        row: &[Value],
        leaf: bool,
        child: Option<u32>,
        row_id: u64,
    ) -> EncodedRecord {
        let table = Arc::clone(&self.table);
        let charset = table.charset();

        let mut bitmap = vec![0u8; table.null_bitmap_size()];
        if leaf {
            for (bit, &col_idx) in table.nullable_columns().iter().enumerate() {
                if row[col_idx].is_null() {
                    bitmap[bit / 8] |= 1 << (bit % 8);
                }
            }
        }

        let var_list = if leaf {
            table.variable_length_columns()
        } else {
            table.primary_key_variable_length_columns()
        };
        let mut length_entries: Vec<Vec<u8>> = Vec::new();
        let mut var_bytes: HashMap<usize, Vec<u8>> = HashMap::new();
        for &col_idx in var_list {
            if leaf && row[col_idx].is_null() {
                continue;
            }
            let column = table.column(col_idx);
            let raw = encode_var_value(column, &row[col_idx], charset);
            let (on_page, external) = if leaf && raw.len() > self.overflow_threshold {
                (self.spill_to_overflow(&raw), true)
            } else {
                (raw, false)
            };
            length_entries.push(encode_length(column, on_page.len(), external, charset));
            var_bytes.insert(col_idx, on_page);
        }

        // Ascending addresses: later list entries sit lower, each two-byte
        // entry is [low, high], and null-bitmap byte 0 ends up adjacent to
        // the record header.
        let mut meta = Vec::new();
        for entry in length_entries.iter().rev() {
            meta.extend_from_slice(entry);
        }
        if leaf {
            meta.extend(bitmap.iter().rev());
        }

        let mut body = Vec::new();
        let mut key = Vec::new();
        if table.has_user_primary_key() {
            for &pk_idx in table.primary_key() {
                let column = table.column(pk_idx);
                if column.is_variable_length(charset) {
                    body.extend_from_slice(&var_bytes[&pk_idx]);
                } else {
                    body.extend_from_slice(&encode_fixed_value(column, &row[pk_idx], charset));
                }
                key.push(row[pk_idx].clone());
            }
        } else {
            body.extend_from_slice(&row_id.to_be_bytes()[2..]);
        }

        if leaf {
            body.extend_from_slice(&[0u8; 13]);
            for (col_idx, column) in table.columns().iter().enumerate() {
                if table.is_primary_key(col_idx) || row[col_idx].is_null() {
                    continue;
                }
                if column.is_variable_length(charset) {
                    body.extend_from_slice(&var_bytes[&col_idx]);
                } else {
                    body.extend_from_slice(&encode_fixed_value(column, &row[col_idx], charset));
                }
            }
        } else {
            body.extend_from_slice(&child.expect("node pointer child").to_be_bytes());
        }

        EncodedRecord {
            meta,
            body,
            key,
            row_id,
            delete_marked: false,
        }
    }

    /// Keeps the 768-byte prefix on-page and chains the rest through BLOB
    /// pages; returns the on-page bytes (prefix + 20-byte pointer).
    fn spill_to_overflow(&mut self, raw: &[u8]) -> Vec<u8> {
        assert!(
            raw.len() > EXTERN_PREFIX_SIZE,
            "overflow values must exceed the on-page prefix"
        );
        let spilled = &raw[EXTERN_PREFIX_SIZE..];
        let first_page = self.alloc_blob_chain(spilled);

        let mut on_page = raw[..EXTERN_PREFIX_SIZE].to_vec();
        on_page.extend_from_slice(&0u32.to_be_bytes()); // space id
        on_page.extend_from_slice(&first_page.to_be_bytes());
        on_page.extend_from_slice(&(BLOB_DATA_OFFSET as u32).to_be_bytes());
        on_page.extend_from_slice(&(spilled.len() as u64).to_be_bytes());
        on_page
    }

    fn alloc_blob_chain(&mut self, data: &[u8]) -> u32 {
        let chunks: Vec<&[u8]> = data.chunks(self.blob_chunk_size).collect();
        let first_page = self.pages.len() as u32;
        for (i, chunk) in chunks.iter().enumerate() {
            let page_no = first_page + i as u32;
            let next = if i + 1 < chunks.len() {
                page_no + 1
            } else {
                FIL_NULL
            };
            self.pages.push(blob_page(page_no, chunk, next));
        }
        first_page
    }

    fn assemble_index_page(
        &self,
        page_no: u32,
        records: &[EncodedRecord],
        level: u16,
        min_rec_first: bool,
    ) -> Vec<u8> {
        let leaf = level == 0;
        let mut page = vec![0u8; PAGE_SIZE];

        page[4..8].copy_from_slice(&page_no.to_be_bytes());
        page[8..12].copy_from_slice(&FIL_NULL.to_be_bytes());
        page[12..16].copy_from_slice(&FIL_NULL.to_be_bytes());
        page[24..26].copy_from_slice(&PAGE_TYPE_INDEX.to_be_bytes());

        // system records; next offsets patched below
        let inf_header = INFIMUM_OFFSET - RECORD_HEADER_SIZE;
        page[inf_header] = 0x01;
        page[inf_header + 1..inf_header + 3].copy_from_slice(&2u16.to_be_bytes()); // heap 0, infimum
        page[INFIMUM_OFFSET..INFIMUM_OFFSET + 8].copy_from_slice(INFIMUM_BODY);
        let sup_header = SUPREMUM_OFFSET - RECORD_HEADER_SIZE;
        page[sup_header + 1..sup_header + 3].copy_from_slice(&(1u16 << 3 | 3).to_be_bytes());
        page[SUPREMUM_OFFSET..SUPREMUM_OFFSET + 8].copy_from_slice(SUPREMUM_BODY);

        // place records on the heap
        let mut origins = Vec::with_capacity(records.len());
        let mut pos = USER_RECORDS_OFFSET;
        for record in records {
            let origin = pos + record.meta.len() + RECORD_HEADER_SIZE;
            page[pos..pos + record.meta.len()].copy_from_slice(&record.meta);
            page[origin..origin + record.body.len()].copy_from_slice(&record.body);
            origins.push(origin);
            pos = origin + record.body.len();
        }
        let heap_top = pos;

        // record headers and the next chain
        let inf_next = origins.first().copied().unwrap_or(SUPREMUM_OFFSET);
        page[inf_header + 3..inf_header + 5]
            .copy_from_slice(&((inf_next as i64 - INFIMUM_OFFSET as i64) as i16).to_be_bytes());
        for (i, (record, &origin)) in records.iter().zip(&origins).enumerate() {
            let header_at = origin - RECORD_HEADER_SIZE;
            let mut flags = 0u8;
            if record.delete_marked {
                flags |= DELETE_MARK_FLAG;
            }
            if min_rec_first && i == 0 {
                flags |= MIN_REC_FLAG;
            }
            page[header_at] = flags;
            let heap_no = (i + 2) as u16;
            let type_code = if leaf { 0u16 } else { 1u16 };
            page[header_at + 1..header_at + 3]
                .copy_from_slice(&(heap_no << 3 | type_code).to_be_bytes());
            let next = origins.get(i + 1).copied().unwrap_or(SUPREMUM_OFFSET);
            page[header_at + 3..header_at + 5]
                .copy_from_slice(&((next as i64 - origin as i64) as i16).to_be_bytes());
        }

        // directory: owners every eight records, supremum owns the tail
        let mut slots: Vec<u16> = vec![INFIMUM_OFFSET as u16];
        let mut remaining = records.len();
        let mut consumed = 0usize;
        while remaining >= 8 {
            let owner = consumed + 7;
            page[origins[owner] - RECORD_HEADER_SIZE] |= 8;
            slots.push(origins[owner] as u16);
            consumed += 8;
            remaining -= 8;
        }
        page[sup_header] = (remaining + 1) as u8;
        slots.push(SUPREMUM_OFFSET as u16);
        for (i, slot) in slots.iter().enumerate() {
            let at = PAGE_SIZE - FIL_TRAILER_SIZE - DIR_SLOT_SIZE * (i + 1);
            page[at..at + 2].copy_from_slice(&slot.to_be_bytes());
        }

        // index header
        let ih = FIL_HEADER_SIZE;
        page[ih..ih + 2].copy_from_slice(&(slots.len() as u16).to_be_bytes());
        page[ih + 2..ih + 4].copy_from_slice(&(heap_top as u16).to_be_bytes());
        page[ih + 4..ih + 6]
            .copy_from_slice(&(0x8000u16 | (records.len() as u16 + 2)).to_be_bytes());
        page[ih + 16..ih + 18].copy_from_slice(&(records.len() as u16).to_be_bytes());
        page[ih + 26..ih + 28].copy_from_slice(&level.to_be_bytes());
        page[ih + 28..ih + 36].copy_from_slice(&42u64.to_be_bytes());

        page
    }
}

/// Greedy size-based grouping with an optional per-page record cap.
fn partition(records: Vec<EncodedRecord>, cap: Option<usize>) -> Vec<Vec<EncodedRecord>> {
    let budget = PAGE_SIZE - USER_RECORDS_OFFSET - FIL_TRAILER_SIZE - 128;
    let mut groups = Vec::new();
    let mut current: Vec<EncodedRecord> = Vec::new();
    let mut used = 0usize;
    for record in records {
        let cost = record.page_cost();
        let over_cap = cap.is_some_and(|c| current.len() >= c);
        if !current.is_empty() && (used + cost > budget || over_cap) {
            groups.push(std::mem::take(&mut current));
            used = 0;
        }
        used += cost;
        current.push(record);
    }
    if !current.is_empty() || groups.is_empty() {
        groups.push(current);
    }
    groups
}

fn encode_length(column: &ColumnDef, len: usize, external: bool, charset: Charset) -> Vec<u8> {
    let two_capable =
        column.column_type().is_blob_text() || column.max_byte_length(charset) > 255;
    if external || (two_capable && len > 127) {
        assert!(two_capable, "only wide columns can take two-byte lengths");
        assert!(len < 1 << 14, "two-byte length overflow");
        let high = 0x80 | if external { 0x40 } else { 0 } | (len >> 8) as u8;
        vec![(len & 0xFF) as u8, high]
    } else {
        assert!(len <= 255 && (len <= 127 || !two_capable));
        vec![len as u8]
    }
}

fn encode_var_value(column: &ColumnDef, value: &Value, charset: Charset) -> Vec<u8> {
    match value {
        Value::Text(s) => match charset {
            Charset::Latin1 => s.chars().map(|c| c as u8).collect(),
            _ => s.as_bytes().to_vec(),
        },
        Value::Bytes(b) => b.clone(),
        other => panic!("value {:?} is not variable-length encodable", other),
    }
}

fn encode_fixed_value(column: &ColumnDef, value: &Value, charset: Charset) -> Vec<u8> {
    let ty = column.column_type();
    match (ty, value) {
        (_, Value::Int(v)) if ty.is_integer() => {
            let width = ty.fixed_size().unwrap();
            let bits = 8 * width as u32;
            let raw = (*v as u64) ^ (1u64 << (bits - 1));
            raw.to_be_bytes()[8 - width..].to_vec()
        }
        (_, Value::UInt(v)) if ty.is_integer() => {
            let width = ty.fixed_size().unwrap();
            v.to_be_bytes()[8 - width..].to_vec()
        }
        (ColumnType::Float, Value::Float(v)) => (*v as f32).to_be_bytes().to_vec(),
        (ColumnType::Double, Value::Float(v)) => v.to_be_bytes().to_vec(),
        (ColumnType::Char, Value::Text(s)) => {
            let width = column
                .fixed_byte_length(charset)
                .expect("fixed CHAR width");
            let mut bytes: Vec<u8> = match charset {
                Charset::Latin1 => s.chars().map(|c| c as u8).collect(),
                _ => s.as_bytes().to_vec(),
            };
            assert!(bytes.len() <= width, "CHAR value too long");
            bytes.resize(width, b' ');
            bytes
        }
        (ColumnType::Binary, Value::Bytes(b)) => {
            let width = column.declared_length().unwrap() as usize;
            let mut bytes = b.clone();
            assert!(bytes.len() <= width, "BINARY value too long");
            bytes.resize(width, 0);
            bytes
        }
        (ty, value) => panic!("cannot encode {:?} as {:?}", value, ty),
    }
}

fn stub_page(page_no: u32, page_type: u16) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    page[4..8].copy_from_slice(&page_no.to_be_bytes());
    page[8..12].copy_from_slice(&FIL_NULL.to_be_bytes());
    page[12..16].copy_from_slice(&FIL_NULL.to_be_bytes());
    page[24..26].copy_from_slice(&page_type.to_be_bytes());
    page
}

fn blob_page(page_no: u32, chunk: &[u8], next: u32) -> Vec<u8> {
    assert!(chunk.len() <= BLOB_MAX_DATA_SIZE);
    let mut page = stub_page(page_no, PAGE_TYPE_BLOB);
    page[BLOB_LENGTH_OFFSET..BLOB_LENGTH_OFFSET + 4]
        .copy_from_slice(&(chunk.len() as u32).to_be_bytes());
    page[BLOB_NEXT_PAGE_OFFSET..BLOB_NEXT_PAGE_OFFSET + 4].copy_from_slice(&next.to_be_bytes());
    page[BLOB_DATA_OFFSET..BLOB_DATA_OFFSET + chunk.len()].copy_from_slice(chunk);
    page
}

/// `id INT PRIMARY KEY, name VARCHAR(64), score INT NULL` under latin1.
pub fn simple_table() -> Arc<TableDef> {
    TableDef::new(
        "t_simple",
        vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::varchar("name", 64),
            ColumnDef::new("score", ColumnType::Int).nullable(),
        ],
        &["id"],
        Charset::Latin1,
    )
    .unwrap()
}

/// Rows `id, name = "name-<id>", score = id * 10` for `ids`.
pub fn simple_rows(ids: impl IntoIterator<Item = i64>) -> Vec<Vec<Value>> {
    ids.into_iter()
        .map(|id| {
            vec![
                Value::Int(id),
                Value::Text(format!("name-{:06}", id)),
                Value::Int(id * 10),
            ]
        })
        .collect()
}
