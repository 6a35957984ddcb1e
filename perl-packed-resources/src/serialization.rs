// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Declares the foundational data primitives inside packed resources data. */

/// Header value for version 1 of the standalone packed resources blob.
pub const HEADER_V1: &[u8] = b"plbundle\x01";

/// Number of low bits of an index entry holding the buffer offset.
pub const OFFSET_BITS: u32 = 25;

/// Mask extracting the buffer offset from an index entry.
pub const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;

/// Packed buffers must be strictly smaller than this many bytes.
pub const MAX_BUFFER_SIZE: usize = 1 << OFFSET_BITS;

/// Maximum length of a resource name in bytes.
///
/// The name length is stored biased by one in the 7 high bits of an index
/// entry, so lengths 1 through 128 are representable.
pub const MAX_NAME_LENGTH: usize = 128;

/// A single 32-bit record in the resources index.
///
/// The high 7 bits hold `name_length - 1`. The low 25 bits hold the offset
/// in the packed buffer where the entry's name starts. The payload follows
/// the name and extends to the offset of the next entry.
///
/// The final entry of an index is a terminal entry: only its offset (the
/// length of the packed buffer) is meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct IndexEntry(u32);

impl IndexEntry {
    /// Construct an entry for a resource whose name starts at `offset`.
    ///
    /// Returns `None` if either value cannot be represented.
    pub fn new(name_length: usize, offset: usize) -> Option<Self> {
        if name_length == 0 || name_length > MAX_NAME_LENGTH || offset > OFFSET_MASK as usize {
            return None;
        }

        Some(Self(((name_length as u32 - 1) << OFFSET_BITS) | offset as u32))
    }

    /// Construct the terminal entry recording the end of the packed buffer.
    pub fn terminal(offset: usize) -> Option<Self> {
        if offset > OFFSET_MASK as usize {
            None
        } else {
            Some(Self(offset as u32))
        }
    }

    /// Construct an instance from its serialized value.
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// The serialized value of this entry.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Length of the resource name in bytes.
    ///
    /// Meaningless for terminal entries.
    pub fn name_length(&self) -> usize {
        ((self.0 >> OFFSET_BITS) + 1) as usize
    }

    /// Offset into the packed buffer.
    pub fn offset(&self) -> usize {
        (self.0 & OFFSET_MASK) as usize
    }
}
