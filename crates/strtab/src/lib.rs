#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Deduplicating string table with pooled storage and stable handles.
//!
//! Maps arbitrary byte strings to unique records: equal content is stored
//! exactly once, and every record is addressed by a packed 32-bit [`Handle`]
//! that stays valid for the lifetime of the table. Built for compiler-style
//! consumers (symbol tables, identifier caches) that intern many short
//! strings and want to hang one piece of metadata off each.
//!
//! Two pieces do the work:
//! - a bump-pointer arena that packs variable-length records into 4 KiB
//!   pools, so interning does not cost one heap allocation per string;
//! - an open-addressing hash table (quadratic probing, power-of-two
//!   capacity) whose entries reference arena records by handle.
//!
//! Pools are never moved or freed before the table itself, which is what
//! makes handles stable across table growth.
//!
//! Entries are never removed; there is no eviction and no serialization.
//! The table does no locking; wrap it yourself if you share it across
//! threads.
//!
//! ```
//! use strtab::StringTable;
//!
//! let mut table: StringTable<u32> = StringTable::new();
//! let id = table.update(b"main").handle();
//! *table.payload_mut(id) = 42;
//!
//! assert!(table.insert(b"main").is_none()); // already interned
//! assert_eq!(table.lookup(b"main").unwrap().payload(), &42);
//! ```

mod arena;
mod hash;
mod table;

#[cfg(test)]
mod table_tests;

pub use arena::{Handle, HandleError};
pub use table::{StringTable, StringValue};
