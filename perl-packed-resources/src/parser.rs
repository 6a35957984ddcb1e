// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsing and searching of packed resources data. */

use {
    crate::{
        resource::compare_names,
        serialization::{IndexEntry, HEADER_V1},
    },
    byteorder::{LittleEndian, ReadBytesExt},
    std::{cmp::Ordering, io::Cursor},
};

/// Errors encountered when parsing a serialized packed resources blob.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("data too short to contain a packed resources header")]
    TooShort,

    #[error("unrecognized packed resources header")]
    BadHeader,

    #[error("index claims {0} entries but data is truncated")]
    TruncatedIndex(usize),

    #[error("terminal offset {expected} does not match buffer length {actual}")]
    TerminalMismatch { expected: usize, actual: usize },

    #[error("index entry {0} points outside of its bounds")]
    BadOffset(usize),

    #[error("index entry {0} is not in sorted order")]
    Unsorted(usize),
}

/// Resolve the `(name, payload)` of entry `i`.
pub(crate) fn resolve_entry<'a>(
    index: &[IndexEntry],
    data: &'a [u8],
    i: usize,
) -> Option<(&'a [u8], &'a [u8])> {
    let entry = index.get(i)?;
    let end = index.get(i + 1)?.offset();
    let name_end = entry.offset() + entry.name_length();

    Some((data.get(entry.offset()..name_end)?, data.get(name_end..end)?))
}

/// Find the payload of a named resource in an index and buffer.
///
/// The bracket `[low, high)` starts as the whole index. The query length is
/// compared with the probed entry's name length first and only when they are
/// equal are the name bytes compared. This mirrors the packing order and is
/// the exact algorithm emitted in generated C code.
pub fn find_in_index<'a>(index: &[IndexEntry], data: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let mut low = 0;
    let mut high = index.len().checked_sub(1)?;

    while low < high {
        let mid = low + (high - low) / 2;
        let entry = index[mid];

        let ordering = match name.len().cmp(&entry.name_length()) {
            Ordering::Equal => {
                let start = entry.offset();
                name.cmp(data.get(start..start + name.len())?)
            }
            ordering => ordering,
        };

        match ordering {
            Ordering::Less => high = mid,
            Ordering::Greater => low = mid + 1,
            Ordering::Equal => return resolve_entry(index, data, mid).map(|(_, payload)| payload),
        }
    }

    None
}

/// A read-only view of packed resources backed by borrowed data.
#[derive(Clone, Debug)]
pub struct PackedResourcesView<'a> {
    index: Vec<IndexEntry>,
    data: &'a [u8],
}

impl<'a> PackedResourcesView<'a> {
    pub(crate) fn from_parts(index: Vec<IndexEntry>, data: &'a [u8]) -> Self {
        Self { index, data }
    }

    /// Parse a serialized blob, as produced by `PackedResources::write_blob()`.
    ///
    /// The index is fully validated so subsequent lookups cannot address
    /// data outside the buffer.
    pub fn parse(blob: &'a [u8]) -> Result<Self, ParseError> {
        if blob.len() < HEADER_V1.len() + 4 {
            return Err(ParseError::TooShort);
        }

        if &blob[0..HEADER_V1.len()] != HEADER_V1 {
            return Err(ParseError::BadHeader);
        }

        let mut reader = Cursor::new(&blob[HEADER_V1.len()..]);
        let count = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| ParseError::TooShort)? as usize;

        if blob.len() < HEADER_V1.len() + 4 * (count + 2) {
            return Err(ParseError::TruncatedIndex(count));
        }

        let mut index = Vec::with_capacity(count + 1);
        for _ in 0..count + 1 {
            index.push(IndexEntry::from_raw(
                reader
                    .read_u32::<LittleEndian>()
                    .map_err(|_| ParseError::TruncatedIndex(count))?,
            ));
        }

        let data = &blob[HEADER_V1.len() + 4 * (count + 2)..];

        let terminal = index[count].offset();
        if terminal != data.len() {
            return Err(ParseError::TerminalMismatch {
                expected: terminal,
                actual: data.len(),
            });
        }

        let mut expected_offset = 0;
        for i in 0..count {
            let entry = index[i];
            if entry.offset() != expected_offset
                || entry.offset() + entry.name_length() > index[i + 1].offset()
            {
                return Err(ParseError::BadOffset(i));
            }
            expected_offset = index[i + 1].offset();

            if i > 0 {
                let (previous, _) =
                    resolve_entry(&index, data, i - 1).ok_or(ParseError::BadOffset(i))?;
                let (current, _) =
                    resolve_entry(&index, data, i).ok_or(ParseError::BadOffset(i))?;

                if compare_names(previous, current) != Ordering::Less {
                    return Err(ParseError::Unsorted(i));
                }
            }
        }

        Ok(Self { index, data })
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.index.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the payload of a resource by name.
    pub fn find(&self, name: &[u8]) -> Option<&'a [u8]> {
        find_in_index(&self.index, self.data, name)
    }

    /// Iterate over `(name, payload)` pairs in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + '_ {
        (0..self.len()).filter_map(move |i| resolve_entry(&self.index, self.data, i))
    }
}
