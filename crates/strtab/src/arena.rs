//! Pooled record storage and the packed handle addressing it.
//!
//! Records are bump-allocated out of fixed-size byte pools. A pool is
//! append-only: once a record is written it is never moved, resized, or
//! individually freed, so a [`Handle`] handed out for it stays valid until
//! the whole arena is dropped. That stability is what lets the hash table
//! double its entry array without disturbing any record.
//!
//! Record layout inside a pool, 8-byte aligned:
//!
//! ```text
//! +--------------+------------+-----------------+----+---------+
//! | value index  | length     | key bytes       | \0 | padding |
//! | u32 LE       | u32 LE     | `length` bytes  |    | to 8    |
//! +--------------+------------+-----------------+----+---------+
//! ```
//!
//! The value index points into the table's side array of payload slots;
//! it doubles as a back-reference when validating foreign handles.

/// Bits of a handle reserved for the in-pool byte offset.
const POOL_BITS: u32 = 12;

/// Standard pool size. Records larger than this get a dedicated pool.
pub(crate) const POOL_SIZE: usize = 1 << POOL_BITS;

/// Fixed per-record header: value index + key length.
pub(crate) const HEADER_BYTES: usize = 8;

/// Handles store the pool index 1-based in the high bits, so this many
/// pools can exist before the packing overflows.
const MAX_POOLS: usize = (1 << (32 - POOL_BITS)) - 1;

/// Opaque reference to one record in a [`StringTable`](crate::StringTable).
///
/// Copyable and cheap to compare: two handles are equal exactly when they
/// name the same record of the same table. Ordering follows the packed
/// representation (allocation order within a table), not key content.
///
/// Internally this packs `(pool index + 1) << 12 | byte offset`; zero is
/// reserved, which is what gives `Option<Handle>` a free niche.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Handle(std::num::NonZeroU32);

impl Handle {
    /// Raw packed value, for serialization or debugging by the consumer.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }

    /// Rebuild a handle from [`as_u32`](Self::as_u32) output. Returns
    /// `None` for 0, the reserved "no record" value.
    ///
    /// Only meaningful for values previously obtained from the same table;
    /// anything else is rejected by [`try_get`](crate::StringTable::try_get).
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        std::num::NonZeroU32::new(raw).map(Self)
    }
}

/// Why a handle could not be resolved to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// The pool index exceeds the number of pools the arena has allocated.
    #[error("pool index {pool} out of range ({pools} pools allocated)")]
    PoolOutOfRange { pool: u32, pools: usize },

    /// The offset leaves no room for a record header in its pool.
    #[error("offset {offset} leaves no room for a record header")]
    NoHeaderRoom { offset: usize },

    /// The record's claimed extent runs past the end of its pool.
    #[error("record at offset {offset} extends past the end of its pool")]
    Truncated { offset: usize },

    /// The record's value index is not a live slot of this table.
    #[error("record value index {index} out of range")]
    ValueOutOfRange { index: u32 },

    /// The handle decodes cleanly but does not point at the start of the
    /// record it claims to be (e.g. a handle from a different table).
    #[error("handle does not match the record it points to")]
    Mismatched,
}

/// Raw decoded record: header fields plus the key bytes still in the pool.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Record<'a> {
    /// Index into the table's payload slot array.
    pub(crate) value_index: u32,
    /// Key bytes followed by the 0 terminator.
    pub(crate) bytes_with_nul: &'a [u8],
}

impl<'a> Record<'a> {
    /// Key bytes without the terminator.
    #[inline]
    pub(crate) fn bytes(self) -> &'a [u8] {
        &self.bytes_with_nul[..self.bytes_with_nul.len() - 1]
    }
}

/// Bump allocator over a growing list of byte pools.
pub(crate) struct Arena {
    pools: Vec<Box<[u8]>>,
    /// Bump cursor into the last pool. May exceed that pool's length after
    /// an oversized allocation, which simply forces a fresh pool next time.
    fill: usize,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self {
            pools: Vec::new(),
            fill: 0,
        }
    }

    /// Materialize a record for `key`, tagged with the table's value index.
    ///
    /// Opens a new pool when the current one cannot hold the record; a
    /// record bigger than [`POOL_SIZE`] gets a pool sized exactly to it and
    /// sits alone at offset 0. The cursor advances by the record size
    /// rounded up to a multiple of 8 so the next header stays aligned.
    pub(crate) fn alloc(&mut self, key: &[u8], value_index: u32) -> Handle {
        assert!(
            u32::try_from(key.len()).is_ok(),
            "key length {} does not fit the record header",
            key.len()
        );
        let needed = HEADER_BYTES + key.len() + 1;

        let exhausted = match self.pools.last() {
            Some(pool) => self.fill + needed > pool.len(),
            None => true,
        };
        if exhausted {
            assert!(self.pools.len() < MAX_POOLS, "pool count exceeds handle range");
            self.pools
                .push(vec![0u8; needed.max(POOL_SIZE)].into_boxed_slice());
            self.fill = 0;
        }

        let offset = self.fill;
        let pool_index = self.pools.len() - 1;
        let pool = &mut self.pools[pool_index];

        pool[offset..offset + 4].copy_from_slice(&value_index.to_le_bytes());
        pool[offset + 4..offset + 8].copy_from_slice(&(key.len() as u32).to_le_bytes());
        pool[offset + HEADER_BYTES..offset + HEADER_BYTES + key.len()].copy_from_slice(key);
        pool[offset + HEADER_BYTES + key.len()] = 0;

        self.fill = offset + needed.next_multiple_of(8);

        let raw = ((pool_index as u32 + 1) << POOL_BITS) | offset as u32;
        match Handle::from_raw(raw) {
            Some(handle) => handle,
            // Unreachable: the 1-based pool index keeps the high bits nonzero.
            None => panic!("arena produced the reserved null handle"),
        }
    }

    /// Bounds-checked decode of a handle back into its record.
    ///
    /// Never dereferences anything before validating that the pool exists
    /// and that the header and claimed extent lie inside it. The value
    /// index is *not* checked here; the table owns that half of the check.
    pub(crate) fn get(&self, handle: Handle) -> Result<Record<'_>, HandleError> {
        let raw = handle.as_u32();
        let pool_1based = raw >> POOL_BITS;
        let offset = (raw as usize) & (POOL_SIZE - 1);

        let pool = pool_1based
            .checked_sub(1)
            .and_then(|i| self.pools.get(i as usize))
            .ok_or(HandleError::PoolOutOfRange {
                pool: pool_1based,
                pools: self.pools.len(),
            })?;

        if offset + HEADER_BYTES > pool.len() {
            return Err(HandleError::NoHeaderRoom { offset });
        }
        let value_index = read_u32_le(pool, offset);
        let length = read_u32_le(pool, offset + 4) as usize;

        let body = offset + HEADER_BYTES;
        let end = body
            .checked_add(length)
            .and_then(|v| v.checked_add(1))
            .filter(|&v| v <= pool.len())
            .ok_or(HandleError::Truncated { offset })?;

        Ok(Record {
            value_index,
            bytes_with_nul: &pool[body..end],
        })
    }

    pub(crate) fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("pools", &self.pools.len())
            .field("fill", &self.fill)
            .finish()
    }
}

#[inline]
fn read_u32_le(pool: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([pool[at], pool[at + 1], pool[at + 2], pool[at + 3]])
}
