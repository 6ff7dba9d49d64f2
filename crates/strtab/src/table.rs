//! Open-addressing hash table over arena-allocated string records.
//!
//! Quadratic probing with triangular-number steps over a power-of-two
//! capacity. That pairing visits every slot exactly once before repeating,
//! so the probe loop terminates as long as one slot is free, an invariant
//! the growth threshold maintains and an assertion enforces on every
//! insertion path.
//!
//! Growth doubles the entry array and re-slots entries by their stored
//! hash. Records live in the arena and are addressed by handle, so growth
//! never touches or invalidates them.

use crate::arena::{Arena, Record};
use crate::hash::hash_bytes;
use crate::{Handle, HandleError};

/// Grow when `count + 1 > capacity * 4/5`. Integer arithmetic on purpose:
/// the probe-termination invariant should not hinge on float rounding.
const LOAD_NUM: usize = 4;
const LOAD_DEN: usize = 5;

const MIN_CAPACITY: usize = 32;

/// One table slot. `handle: None` means empty; there are no tombstones
/// because records are never removed.
#[derive(Clone, Copy)]
struct Entry {
    hash: u32,
    handle: Option<Handle>,
}

impl Entry {
    const EMPTY: Entry = Entry {
        hash: 0,
        handle: None,
    };
}

/// Per-record table-side state, in creation order. The arena record's
/// value index points back here.
struct ValueSlot<P> {
    handle: Handle,
    payload: P,
}

/// Deduplicating table of byte strings with attachable per-record payloads.
///
/// Equal content is stored exactly once. Every record gets a stable
/// [`Handle`] and one payload slot of type `P` that the table initializes
/// to `P::default()` and otherwise never reads, writes, or interprets.
///
/// Records accumulate monotonically; dropping the table is the only
/// reclamation. Borrowed [`StringValue`] views keep the table borrowed, so
/// they cannot outlive it.
pub struct StringTable<P = ()> {
    entries: Vec<Entry>,
    values: Vec<ValueSlot<P>>,
    arena: Arena,
}

/// Non-owning view of one interned record.
///
/// Cheap to copy; carries the record's handle, its bytes (terminator
/// included), and a borrow of its payload slot.
pub struct StringValue<'a, P> {
    handle: Handle,
    bytes_with_nul: &'a [u8],
    payload: &'a P,
}

// Manual impls: the view only holds references, so it is Copy for any `P`.
impl<P> Clone for StringValue<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for StringValue<'_, P> {}

impl<'a, P> StringValue<'a, P> {
    /// Stable identity of this record within its table.
    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Key length in bytes, excluding the terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes_with_nul.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.bytes_with_nul[..self.len()]
    }

    /// The key bytes plus the trailing 0 byte, for C-string consumers.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &'a [u8] {
        self.bytes_with_nul
    }

    /// The key as UTF-8, if it is valid UTF-8.
    #[inline]
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// The record's payload slot.
    #[inline]
    pub fn payload(&self) -> &'a P {
        self.payload
    }
}

impl<P> std::fmt::Debug for StringValue<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringValue")
            .field("handle", &self.handle.as_u32())
            .field("key", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

impl<P> StringTable<P> {
    /// Table with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Table pre-sized for roughly `hint` records.
    ///
    /// The entry array capacity is `hint + hint/4` rounded up to a power of
    /// two, at least 32, so `hint` insertions fit without growing.
    pub fn with_capacity(hint: usize) -> Self {
        let capacity = (hint + hint / 4).next_power_of_two().max(MIN_CAPACITY);
        Self {
            entries: vec![Entry::EMPTY; capacity],
            values: Vec::new(),
            arena: Arena::new(),
        }
    }

    /// Number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current entry-array capacity (always a power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Find `key`, or report its absence. Absence is a normal outcome.
    pub fn lookup(&self, key: &[u8]) -> Option<StringValue<'_, P>> {
        let hash = hash_bytes(key);
        let slot = Self::find_slot(&self.entries, &self.arena, hash, key);
        let handle = self.entries[slot].handle?;
        Some(self.view(handle))
    }

    /// Resolve a handle previously returned by this table.
    ///
    /// # Panics
    /// Panics if the handle did not come from this table. Use
    /// [`try_get`](Self::try_get) when that cannot be ruled out.
    pub fn get(&self, handle: Handle) -> StringValue<'_, P> {
        match self.try_get(handle) {
            Ok(value) => value,
            Err(err) => panic!("StringTable::get: {err}"),
        }
    }

    /// Checked handle resolution.
    ///
    /// Validates the full decode path: pool bounds, record extent, and the
    /// record's back-reference, so a handle forged or taken from another
    /// table comes back as an error instead of aliasing some record.
    pub fn try_get(&self, handle: Handle) -> Result<StringValue<'_, P>, HandleError> {
        let (record, index) = self.resolve(handle)?;
        Ok(StringValue {
            handle,
            bytes_with_nul: record.bytes_with_nul,
            payload: &self.values[index].payload,
        })
    }

    /// Mutable access to a record's payload slot.
    ///
    /// # Panics
    /// Panics if the handle did not come from this table.
    pub fn payload_mut(&mut self, handle: Handle) -> &mut P {
        let index = match self.resolve(handle) {
            Ok((_, index)) => index,
            Err(err) => panic!("StringTable::payload_mut: {err}"),
        };
        &mut self.values[index].payload
    }

    /// Decode a handle and verify its back-reference against the live
    /// value slots. Everything checked resolution needs, in one place.
    fn resolve(&self, handle: Handle) -> Result<(Record<'_>, usize), HandleError> {
        let record = self.arena.get(handle)?;
        let index = record.value_index as usize;
        match self.values.get(index) {
            Some(slot) if slot.handle == handle => Ok((record, index)),
            Some(_) => Err(HandleError::Mismatched),
            None => Err(HandleError::ValueOutOfRange {
                index: record.value_index,
            }),
        }
    }

    /// All records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = StringValue<'_, P>> {
        self.values.iter().map(|slot| self.view(slot.handle))
    }

    /// Intern `key` if absent. Returns `None` when the key is already
    /// present, which is a normal outcome, not an error.
    pub fn insert(&mut self, key: &[u8]) -> Option<StringValue<'_, P>>
    where
        P: Default,
    {
        let hash = hash_bytes(key);
        let slot = Self::find_slot(&self.entries, &self.arena, hash, key);
        if self.entries[slot].handle.is_some() {
            return None;
        }
        Some(self.insert_at(slot, hash, key))
    }

    /// Get-or-create: the existing record if `key` is present, a fresh one
    /// otherwise. Idempotent.
    pub fn update(&mut self, key: &[u8]) -> StringValue<'_, P>
    where
        P: Default,
    {
        let hash = hash_bytes(key);
        let slot = Self::find_slot(&self.entries, &self.arena, hash, key);
        if let Some(handle) = self.entries[slot].handle {
            return self.view(handle);
        }
        self.insert_at(slot, hash, key)
    }

    /// Fill a known-empty slot, growing first if the load factor says so.
    fn insert_at(&mut self, mut slot: usize, hash: u32, key: &[u8]) -> StringValue<'_, P>
    where
        P: Default,
    {
        if (self.values.len() + 1) * LOAD_DEN > self.entries.len() * LOAD_NUM {
            self.grow();
            // Bucket assignment depends on capacity.
            slot = Self::find_slot(&self.entries, &self.arena, hash, key);
        }
        // Probe termination requires a free slot; the growth threshold
        // above must keep this strict.
        assert!(
            self.values.len() < self.entries.len(),
            "string table has no free slot after growth check"
        );

        let value_index = self.values.len() as u32;
        let handle = self.arena.alloc(key, value_index);
        self.values.push(ValueSlot {
            handle,
            payload: P::default(),
        });
        self.entries[slot] = Entry {
            hash,
            handle: Some(handle),
        };
        self.view(handle)
    }

    /// Double the entry array and re-slot every occupied entry using its
    /// stored hash. Entries are copied verbatim; the arena is untouched,
    /// so records and handles survive growth bit-identical.
    fn grow(&mut self) {
        let mut next = vec![Entry::EMPTY; self.entries.len() * 2];
        for entry in &self.entries {
            let Some(handle) = entry.handle else { continue };
            let record = match self.arena.get(handle) {
                Ok(record) => record,
                Err(err) => panic!("string table corrupt during growth: {err}"),
            };
            let slot = Self::find_slot(&next, &self.arena, entry.hash, record.bytes());
            next[slot] = *entry;
        }
        self.entries = next;
    }

    /// Quadratic probe: start at `hash & (capacity-1)`, step by 1, 2, 3, …
    /// Returns the slot holding `key` or the first empty slot on its probe
    /// sequence. Associated fn so `grow` can probe a detached entry array.
    fn find_slot(entries: &[Entry], arena: &Arena, hash: u32, key: &[u8]) -> usize {
        let mask = entries.len() - 1;
        let mut index = hash as usize & mask;
        let mut step = 1;
        loop {
            let entry = &entries[index];
            match entry.handle {
                None => return index,
                Some(handle) if entry.hash == hash => {
                    let record = match arena.get(handle) {
                        Ok(record) => record,
                        Err(err) => panic!("string table corrupt: {err}"),
                    };
                    if record.bytes() == key {
                        return index;
                    }
                }
                Some(_) => {}
            }
            index = (index + step) & mask;
            step += 1;
        }
    }

    fn view(&self, handle: Handle) -> StringValue<'_, P> {
        match self.try_get(handle) {
            Ok(value) => value,
            Err(err) => panic!("string table corrupt: {err}"),
        }
    }

    /// Number of arena pools backing this table.
    pub(crate) fn pool_count(&self) -> usize {
        self.arena.pool_count()
    }
}

impl<P> Default for StringTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for StringTable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTable")
            .field("len", &self.values.len())
            .field("capacity", &self.entries.len())
            .field("pools", &self.arena.pool_count())
            .finish()
    }
}
