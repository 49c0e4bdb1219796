//! # Character Sets
//!
//! Only the charsets the reader can decode are modeled. The important
//! property for record decoding is `max_bytes_per_char`: it decides whether
//! `CHAR` columns are stored fixed or variable-length and feeds the
//! one-vs-two-byte length rule for character columns.

use eyre::Result;

use crate::error::ReaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// Single-byte, decoded via the Latin-1 code page.
    Latin1,
    /// Up to three bytes per character (the legacy utf8 alias).
    Utf8mb3,
    /// Up to four bytes per character.
    Utf8mb4,
    /// No character semantics; values stay raw bytes.
    Binary,
}

impl Charset {
    pub fn max_bytes_per_char(self) -> usize {
        match self {
            Charset::Latin1 | Charset::Binary => 1,
            Charset::Utf8mb3 => 3,
            Charset::Utf8mb4 => 4,
        }
    }

    /// Decodes stored column bytes into a string.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf8mb3 | Charset::Utf8mb4 | Charset::Binary => {
                std::str::from_utf8(bytes).map(str::to_owned).map_err(|e| {
                    ReaderError::MalformedRecord(format!("invalid utf-8 in text column: {}", e))
                        .into()
                })
            }
        }
    }
}
