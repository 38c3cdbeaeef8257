//! Patch identity: program content with cosmetic bytes blanked out.
//!
//! Two programs that differ only in their names (or in bytes the synth does
//! not use) are the same sound. [`fingerprint`] zeroes those byte ranges so
//! the result can be compared or hashed for deduplication.

use crate::device::DataKind;
use crate::error::Result;
use crate::program::ProgramBuffer;

/// Half-open byte range `[start, end)` excluded from identity comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankZone {
    pub start: usize,
    pub end: usize,
}

impl BlankZone {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Cosmetic and unused ranges of a Rev2 program.
pub const REV2_BLANK_ZONES: &[BlankZone] = &[
    // Unused according to the programming reference
    BlankZone::new(211, 231),
    BlankZone::new(1235, 1255),
    // Layer names
    BlankZone::new(235, 255),
    BlankZone::new(1259, 1279),
    // Two bytes the firmware never encodes, plus the pad up to the working size.
    // Kept exactly as the hardware behaves.
    BlankZone::new(2044, 2047),
];

/// Canonical form of a program used for equality and hashing only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(Vec<u8>);

impl IdentityKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Copy `buffer` with every byte inside any of `zones` set to zero.
///
/// Zones reaching past the end of the buffer are clipped.
pub fn fingerprint(buffer: &[u8], zones: &[BlankZone]) -> IdentityKey {
    let mut data = buffer.to_vec();
    for zone in zones {
        let end = zone.end.min(data.len());
        if zone.start < end {
            data[zone.start..end].fill(0);
        }
    }
    IdentityKey(data)
}

/// The part of a data item that decides whether two items are the same.
///
/// Programs are brought to their 2048-byte working form and fingerprinted,
/// so the 2046 and 2048 byte forms of a program compare equal. Global
/// settings and tunings carry no cosmetic data and are returned whole.
pub fn filter_voice_relevant_data(kind: DataKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        DataKind::Patch => Ok(ProgramBuffer::from_bytes(data)?.identity().0),
        DataKind::GlobalSettings | DataKind::AlternateTuning => Ok(data.to_vec()),
    }
}
