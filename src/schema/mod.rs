//! # Table Definition
//!
//! `TableDef` is the schema contract the decoder works against: the ordered
//! column list, which columns form the primary key, which are nullable, and
//! which carry per-value lengths in the record header.
//!
//! ## Column orderings
//!
//! Three derived orderings matter and are precomputed on construction:
//!
//! - **nullable columns** in schema order; bit *i* of the null bitmap
//!   corresponds to the *i*-th nullable column
//! - **variable-length columns** in *record* order: primary-key columns are
//!   stored first in the record body, so their length entries come first in
//!   the backward-growing length array, followed by the remaining
//!   variable-length columns in schema order
//! - **primary-key variable-length columns**, the subset traversed on
//!   node-pointer records (which carry only the key prefix)
//!
//! ## Row-id tables
//!
//! A table without a user primary key is clustered on a hidden 6-byte row
//! id. The decoder skips it and exposes no key values, so such tables only
//! support full traversal, not point or range queries.

use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;

use crate::error::ReaderError;
use crate::types::{Charset, ColumnDef};

#[derive(Debug)]
pub struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    charset: Charset,
    by_name: HashMap<String, usize>,
    primary_key: Vec<usize>,
    nullable: Vec<usize>,
    variable_length: Vec<usize>,
    primary_key_variable_length: Vec<usize>,
}

impl TableDef {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        primary_key: &[&str],
        charset: Charset,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        if columns.is_empty() {
            return Err(ReaderError::SchemaMismatch(format!(
                "table {} has no columns",
                name
            ))
            .into());
        }

        let mut by_name = HashMap::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            if by_name.insert(col.name().to_string(), idx).is_some() {
                return Err(ReaderError::SchemaMismatch(format!(
                    "duplicate column name {:?} in table {}",
                    col.name(),
                    name
                ))
                .into());
            }
        }

        let mut pk = Vec::with_capacity(primary_key.len());
        for key_col in primary_key {
            let idx = *by_name.get(*key_col).ok_or_else(|| {
                ReaderError::SchemaMismatch(format!(
                    "primary key column {:?} not defined in table {}",
                    key_col, name
                ))
            })?;
            if columns[idx].is_nullable() {
                return Err(ReaderError::SchemaMismatch(format!(
                    "primary key column {:?} must not be nullable",
                    key_col
                ))
                .into());
            }
            pk.push(idx);
        }

        let nullable: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_nullable())
            .map(|(i, _)| i)
            .collect();

        let pk_var_len: Vec<usize> = pk
            .iter()
            .copied()
            .filter(|&i| columns[i].is_variable_length(charset))
            .collect();

        // Record order: key columns first, then the rest in schema order.
        let mut variable_length = pk_var_len.clone();
        variable_length.extend(
            columns
                .iter()
                .enumerate()
                .filter(|(i, c)| !pk.contains(i) && c.is_variable_length(charset))
                .map(|(i, _)| i),
        );

        Ok(Arc::new(Self {
            name,
            columns,
            charset,
            by_name,
            primary_key: pk,
            nullable,
            variable_length,
            primary_key_variable_length: pk_var_len,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn max_bytes_per_char(&self) -> usize {
        self.charset.max_bytes_per_char()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> &ColumnDef {
        &self.columns[idx]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Indices of the primary-key columns, in key order.
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn primary_key_len(&self) -> usize {
        self.primary_key.len()
    }

    pub fn has_user_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn is_primary_key(&self, idx: usize) -> bool {
        self.primary_key.contains(&idx)
    }

    /// Indices of nullable columns in schema order; position in this list is
    /// the column's bit position in the null bitmap.
    pub fn nullable_columns(&self) -> &[usize] {
        &self.nullable
    }

    pub fn nullable_count(&self) -> usize {
        self.nullable.len()
    }

    pub fn null_bitmap_size(&self) -> usize {
        self.nullable.len().div_ceil(8)
    }

    /// Indices of variable-length columns in record order (key columns
    /// first); position in this list is the column's position in the
    /// backward-growing length array.
    pub fn variable_length_columns(&self) -> &[usize] {
        &self.variable_length
    }

    /// The variable-length subset of the primary key, traversed on
    /// node-pointer records.
    pub fn primary_key_variable_length_columns(&self) -> &[usize] {
        &self.primary_key_variable_length
    }
}
