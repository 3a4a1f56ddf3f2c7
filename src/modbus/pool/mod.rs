//! Fixed-capacity slot pool.
//!
//! Storage for in-flight command records. Records live in a plain array next
//! to a parallel in-use array indexed identically; a slot is claimed by a
//! linear scan for the first free index, so the worst-case cost of
//! [`SlotPool::allocate`] is exactly `N` comparisons.
//!
//! ```rust
//! use zb_modbus::modbus::pool::SlotPool;
//!
//! let mut pool: SlotPool<u32, 2> = SlotPool::new();
//! let a = pool.allocate().unwrap();
//! let b = pool.allocate().unwrap();
//! assert!(pool.allocate().is_err());
//!
//! pool.free(a);
//! assert_eq!(pool.allocate().unwrap(), a);
//! # let _ = b;
//! ```

use crate::error::Error;
use core::array;


/// Handle to an allocated slot.
///
/// Only the pool hands these out. A handle stays meaningful until it is
/// passed to [`SlotPool::free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(u8);

impl SlotId {
    /// Array index of the slot.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Raw slot number, as carried in send tokens.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Rebuild a handle from a raw slot number.
    ///
    /// The pool still checks the slot is in use before giving access to it.
    pub fn from_raw(raw: u8) -> Self {
        SlotId(raw)
    }
}

/// A statically sized pool of `N` records.
#[derive(Debug)]
pub struct SlotPool<T, const N: usize> {
    slots: [T; N],
    in_use: [bool; N],
}

impl<T: Default, const N: usize> SlotPool<T, N> {
    const _ASSERT: () = assert!(N > 0 && N <= u8::MAX as usize + 1, "slot ids are 8 bit");

    /// Creates a pool with every slot free.
    pub fn new() -> Self {
        let () = Self::_ASSERT;
        Self {
            slots: array::from_fn(|_| T::default()),
            in_use: [false; N],
        }
    }

    /// Claim the first free slot.
    ///
    /// The record is reset to its default value. On
    /// [`Error::PoolExhausted`] nothing is modified.
    pub fn allocate(&mut self) -> Result<SlotId, Error> {
        let index = self
            .in_use
            .iter()
            .position(|used| !used)
            .ok_or(Error::PoolExhausted)?;
        self.in_use[index] = true;
        self.slots[index] = T::default();
        // N <= 256 is checked at compile time.
        Ok(SlotId(index as u8))
    }

    /// Return a slot to the pool.
    ///
    /// Freeing a slot that is already free, or an id the pool never handed
    /// out, does nothing.
    pub fn free(&mut self, id: SlotId) {
        if let Some(used) = self.in_use.get_mut(id.index()) {
            *used = false;
        }
    }

    /// Borrow an in-use record.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        if self.is_in_use(id) {
            self.slots.get(id.index())
        } else {
            None
        }
    }

    /// Mutably borrow an in-use record.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if self.is_in_use(id) {
            self.slots.get_mut(id.index())
        } else {
            None
        }
    }

    /// Whether `id` refers to an allocated slot.
    pub fn is_in_use(&self, id: SlotId) -> bool {
        self.in_use.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of allocated slots.
    pub fn in_use_count(&self) -> usize {
        self.in_use.iter().filter(|used| **used).count()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        N
    }

    /// In-use slot handles, lowest index first.
    pub fn iter_in_use(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.in_use
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(i, _)| SlotId(i as u8))
    }
}

impl<T: Default, const N: usize> Default for SlotPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
