//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate around the
//! zerocopy on-disk structs.
//!
//! ## be_getters!
//!
//! Generates read-only getter methods for zerocopy struct fields that use
//! big-endian wrapper types (U16, U32, U64). The tablespace format is
//! big-endian throughout, and this crate never writes, so only getters are
//! generated.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::big_endian::{U16, U32};
//!
//! #[repr(C)]
//! struct FilHeader {
//!     page_number: U32,
//!     page_type: U16,
//! }
//!
//! impl FilHeader {
//!     be_getters! {
//!         page_number: u32,
//!         page_type: u16,
//!     }
//! }
//! ```

/// Generates getter methods for zerocopy big-endian fields.
#[macro_export]
macro_rules! be_getters {
    ($($field:ident : $native_ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $field(&self) -> $native_ty {
                self.$field.get()
            }
        )*
    };
}
