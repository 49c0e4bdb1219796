//! # ibread - InnoDB Tablespace Reader
//!
//! ibread reads the on-disk tablespace files (`.ibd`) of MySQL's InnoDB
//! storage engine directly: no server, no SQL layer, no locks. It decodes
//! the clustered-index B+ tree from raw 16 KiB pages and answers point and
//! range queries on the primary key, which makes it useful for forensics,
//! offline exports, and recovering data from files no server will open.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ibread::{
//!     ColumnDef, ColumnType, Charset, ComparisonOp, MmapPageStore,
//!     ReaderConfig, TableDef, TreeNavigator, Value,
//! };
//!
//! let table = TableDef::new(
//!     "users",
//!     vec![
//!         ColumnDef::new("id", ColumnType::Int),
//!         ColumnDef::varchar("name", 255).nullable(),
//!     ],
//!     &["id"],
//!     Charset::Utf8mb4,
//! )?;
//!
//! let store = MmapPageStore::open("users.ibd")?;
//! let nav = TreeNavigator::new(store, table, ReaderConfig::default());
//!
//! let row = nav.point_lookup(&[Value::Int(42)])?;
//! for row in nav.range_iter(
//!     vec![Value::Int(10)], ComparisonOp::Gte,
//!     vec![Value::Int(20)], ComparisonOp::Lt,
//! )? {
//!     let row = row?;
//!     println!("{:?}", row.get("name"));
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Queries (TreeNavigator)           │  point / range / traverse
//! ├─────────────────────────────────────┤
//! │   B+ Tree Navigation (btree)        │  directory search, leaf chain
//! ├─────────────────────────────────────┤
//! │   Record Decoding (record)          │  COMPACT rows, overflow chains
//! ├─────────────────────────────────────┤
//! │   Pages (storage)                   │  FIL headers, page types
//! ├─────────────────────────────────────┤
//! │   Page I/O (PageStore / mmap)       │  16 KiB pages from the file
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Scope
//!
//! The reader is strictly read-only and assumes a quiescent file. It skips
//! the hidden transaction fields rather than interpreting them (no MVCC),
//! navigates only the clustered index (no secondary indexes), and does not
//! verify page checksums. Externally stored values in the pre-8.0 BLOB page
//! format are assembled transparently; the newer LOB format is either
//! rejected or read as NULL, per [`ReaderConfig`].
//!
//! ## Module Overview
//!
//! - [`storage`]: `PageStore` seam, FIL header/trailer, mmap store
//! - [`btree`]: index pages, tree descent, range iteration
//! - [`record`]: record headers, the row decoder, overflow assembly
//! - [`schema`]: `TableDef`, the column metadata contract
//! - [`types`]: values, column types, charsets, key comparison
//! - [`config`]: layout constants and `ReaderConfig`

#[macro_use]
mod macros;

pub mod btree;
pub mod config;
pub mod error;
pub mod record;
pub mod schema;
pub mod storage;
pub mod types;

pub use btree::{ComparisonOp, IndexPage, RangeIterator, SearchOutcome, TreeNavigator};
pub use config::ReaderConfig;
pub use error::ReaderError;
pub use record::{Record, RecordHeader, RecordType};
pub use schema::TableDef;
pub use storage::{MmapPageStore, PageStore};
pub use types::{Charset, ColumnDef, ColumnType, KeyComparator, Value};
