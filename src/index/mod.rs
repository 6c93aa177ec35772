//! The `.idx` file format: one fixed-width, big-endian entry per block
//! group.
//!
//! An entry is exactly `8 + 2*G` bytes: a `u64` base offset into `.dat`
//! followed by `G` signed 16-bit per-slot codes. The in-memory
//! representation below is kept host-endian; [`IndexEntry::write`] and
//! [`IndexEntry::read`] are the only places that swap, which avoids the
//! half-swapped-in-place trap the reference implementation has to live
//! with (see the design notes on endianness).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Per-slot code stored in an [`IndexEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Unpopulated — zero-filled block, or an unused trailing slot in a
    /// partial group.
    Zero,
    /// Compressed length of this block's payload in `.dat`.
    Length(i16),
    /// Back-reference: `k` is the 1-based index into the store's `deps`.
    DepRef(u8),
}

impl Slot {
    fn from_raw(raw: i16) -> Self {
        if raw == 0 {
            Slot::Zero
        } else if raw > 0 {
            Slot::Length(raw)
        } else {
            // -raw is guaranteed <= 64 by construction (deps.len() <= 64).
            Slot::DepRef((-raw) as u8)
        }
    }

    fn to_raw(self) -> i16 {
        match self {
            Slot::Zero => 0,
            Slot::Length(n) => n,
            Slot::DepRef(k) => -(k as i16),
        }
    }
}

/// One block group's index record: a base offset into `.dat` plus `G`
/// per-slot codes.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub base_offset: u64,
    pub offsets: Vec<i16>,
}

impl IndexEntry {
    /// A freshly zeroed entry for a group of `group_size` slots.
    pub fn empty(group_size: usize) -> Self {
        IndexEntry {
            base_offset: 0,
            offsets: vec![0i16; group_size],
        }
    }

    /// On-disk size in bytes of an entry for a group of `group_size` slots.
    pub fn encoded_len(group_size: usize) -> usize {
        8 + 2 * group_size
    }

    pub fn slot(&self, i: usize) -> Slot {
        Slot::from_raw(self.offsets[i])
    }

    pub fn set_slot(&mut self, i: usize, slot: Slot) {
        self.offsets[i] = slot.to_raw();
    }

    /// Number of slots, starting at the front, that are non-zero. Used by
    /// block-count recovery: for the *last* group on disk this is the
    /// number of logical blocks actually present.
    pub fn nonzero_prefix_len(&self) -> usize {
        self.offsets.iter().take_while(|&&v| v != 0).count()
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<BigEndian>(self.base_offset)?;
        for &o in &self.offsets {
            w.write_i16::<BigEndian>(o)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R, group_size: usize) -> io::Result<Self> {
        let base_offset = r.read_u64::<BigEndian>()?;
        let mut offsets = Vec::with_capacity(group_size);
        for _ in 0..group_size {
            offsets.push(r.read_i16::<BigEndian>()?);
        }
        Ok(IndexEntry { base_offset, offsets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_mixed_slots() {
        let mut e = IndexEntry::empty(4);
        e.base_offset = 12345;
        e.set_slot(0, Slot::Length(200));
        e.set_slot(1, Slot::DepRef(3));
        e.set_slot(2, Slot::Zero);
        e.set_slot(3, Slot::Length(1));

        let mut buf = Vec::new();
        e.write(&mut buf).unwrap();
        assert_eq!(buf.len(), IndexEntry::encoded_len(4));

        let back = IndexEntry::read(&mut &buf[..], 4).unwrap();
        assert_eq!(back.base_offset, 12345);
        assert_eq!(back.slot(0), Slot::Length(200));
        assert_eq!(back.slot(1), Slot::DepRef(3));
        assert_eq!(back.slot(2), Slot::Zero);
        assert_eq!(back.slot(3), Slot::Length(1));
    }

    #[test]
    fn is_big_endian_on_disk() {
        let mut e = IndexEntry::empty(1);
        e.base_offset = 0x0102030405060708;
        e.set_slot(0, Slot::Length(0x0A0B_i16 & 0x7FFF));
        let mut buf = Vec::new();
        e.write(&mut buf).unwrap();
        assert_eq!(&buf[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn nonzero_prefix_len_stops_at_first_zero() {
        let mut e = IndexEntry::empty(4);
        e.set_slot(0, Slot::Length(5));
        e.set_slot(1, Slot::Length(7));
        // slot 2 left Zero
        e.set_slot(3, Slot::Length(9));
        assert_eq!(e.nonzero_prefix_len(), 2);
    }
}
