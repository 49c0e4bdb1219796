//! # On-Disk Layout Constants
//!
//! This module centralizes the byte-layout constants of the tablespace
//! format. Values that derive from one another are co-located and pinned by
//! compile-time assertions so they cannot drift apart.
//!
//! ## Page anatomy
//!
//! ```text
//! Offset  Size   Content
//! ------  -----  ----------------------------------------------
//! 0       38     FIL header (checksum, page no, siblings, type)
//! 38      36     index header (INDEX pages only)
//! 74      20     file segment header (opaque to the reader)
//! 94      5      infimum record header
//! 99      8      "infimum\0"
//! 107     5      supremum record header
//! 112     8      "supremum"
//! 120     ...    user record heap, growing upward
//! ...     2*n    page directory, growing downward from the trailer
//! 16376   8      FIL trailer
//! ```
//!
//! All multi-byte on-disk fields are big-endian.

/// Size of every tablespace page.
pub const PAGE_SIZE: usize = 16384;

/// Size of the FIL header at the start of every page.
pub const FIL_HEADER_SIZE: usize = 38;

/// Size of the FIL trailer at the end of every page.
pub const FIL_TRAILER_SIZE: usize = 8;

/// Bytes between the FIL header and trailer.
pub const PAGE_BODY_SIZE: usize = PAGE_SIZE - FIL_HEADER_SIZE - FIL_TRAILER_SIZE;

/// Size of the index header that follows the FIL header on INDEX pages.
pub const INDEX_HEADER_SIZE: usize = 36;

/// Size of the file segment header that follows the index header.
pub const FSEG_HEADER_SIZE: usize = 20;

/// Size of the fixed record header stored immediately before a record origin.
pub const RECORD_HEADER_SIZE: usize = 5;

/// Origin of the infimum system record.
pub const INFIMUM_OFFSET: usize =
    FIL_HEADER_SIZE + INDEX_HEADER_SIZE + FSEG_HEADER_SIZE + RECORD_HEADER_SIZE;

/// Origin of the supremum system record.
pub const SUPREMUM_OFFSET: usize = INFIMUM_OFFSET + SYSTEM_RECORD_BODY_SIZE + RECORD_HEADER_SIZE;

/// Offset where the user record heap begins.
pub const USER_RECORDS_OFFSET: usize = SUPREMUM_OFFSET + SYSTEM_RECORD_BODY_SIZE;

/// Length of the fixed infimum/supremum body strings.
pub const SYSTEM_RECORD_BODY_SIZE: usize = 8;

/// Fixed body of the infimum record.
pub const INFIMUM_BODY: &[u8; SYSTEM_RECORD_BODY_SIZE] = b"infimum\0";

/// Fixed body of the supremum record.
pub const SUPREMUM_BODY: &[u8; SYSTEM_RECORD_BODY_SIZE] = b"supremum";

const _: () = assert!(INFIMUM_OFFSET == 99, "infimum origin derivation mismatch");
const _: () = assert!(SUPREMUM_OFFSET == 112, "supremum origin derivation mismatch");
const _: () = assert!(USER_RECORDS_OFFSET == 120, "heap origin derivation mismatch");

/// Size of one page directory slot (a big-endian record-origin offset).
pub const DIR_SLOT_SIZE: usize = 2;

/// Maximum number of records a directory slot owner may own.
pub const DIR_SLOT_MAX_OWNED: usize = 8;

/// Page number of the clustered index root within a tablespace file.
pub const ROOT_PAGE_NUMBER: u32 = 3;

/// Sentinel page number meaning "no page" in sibling and chain pointers.
pub const FIL_NULL: u32 = 0xFFFF_FFFF;

/// How many consecutive SDI pages may be skipped while locating the root.
pub const MAX_SDI_SKIPS: u32 = 2;

/// Hidden transaction id field width on leaf records.
pub const TRX_ID_SIZE: usize = 6;

/// Hidden rollback pointer field width on leaf records.
pub const ROLL_PTR_SIZE: usize = 7;

/// Hidden bytes between the primary key and the remaining columns on a leaf.
pub const HIDDEN_LEAF_FIELDS_SIZE: usize = TRX_ID_SIZE + ROLL_PTR_SIZE;

/// Width of the implicit row id used when a table has no user primary key.
pub const ROW_ID_SIZE: usize = 6;

/// On-page prefix kept for an externally stored column.
pub const EXTERN_PREFIX_SIZE: usize = 768;

/// Size of the overflow page pointer that follows the prefix.
pub const OVERFLOW_POINTER_SIZE: usize = 20;

/// Child page number width on node-pointer records.
pub const CHILD_PAGE_NUMBER_SIZE: usize = 4;

/// Offset of the chunk length field within a BLOB page.
pub const BLOB_LENGTH_OFFSET: usize = FIL_HEADER_SIZE;

/// Offset of the next-page field within a BLOB page.
pub const BLOB_NEXT_PAGE_OFFSET: usize = BLOB_LENGTH_OFFSET + 4;

/// Offset of the payload within a BLOB page.
pub const BLOB_DATA_OFFSET: usize = BLOB_NEXT_PAGE_OFFSET + 4;

/// Maximum payload a single BLOB page can carry.
pub const BLOB_MAX_DATA_SIZE: usize = PAGE_SIZE - BLOB_DATA_OFFSET - FIL_TRAILER_SIZE;

const _: () = assert!(
    BLOB_DATA_OFFSET == FIL_HEADER_SIZE + 8,
    "blob payload offset derivation mismatch"
);
