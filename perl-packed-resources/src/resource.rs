// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{borrow::Cow, cmp::Ordering};

/// A named payload to be packed.
///
/// Fields are `Cow` so callers can pack data they already hold without
/// copying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource<'a> {
    /// The resource name. Unique within a packed buffer.
    pub name: Cow<'a, [u8]>,

    /// The resource content.
    pub payload: Cow<'a, [u8]>,
}

impl<'a> Resource<'a> {
    pub fn new(name: impl Into<Cow<'a, [u8]>>, payload: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Number of bytes this resource occupies in a packed buffer.
    pub fn packed_length(&self) -> usize {
        self.name.len() + self.payload.len()
    }
}

/// Compare two resource names by the order used in packed buffers.
///
/// Shorter names sort first. Names of equal length compare bytewise. The
/// run-time lookup bisects the index with exactly this comparison, so a
/// plain lexicographic order would break it.
pub fn compare_names(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_names() {
        assert_eq!(compare_names(b"a.pm", b"b.pm"), Ordering::Less);
        assert_eq!(compare_names(b"b.pm", b"ab.pm"), Ordering::Less);
        assert_eq!(compare_names(b"ab.pm", b"ab.pm"), Ordering::Equal);
        assert_eq!(compare_names(b"zz", b"aaa"), Ordering::Less);

        let mut names: Vec<&[u8]> = vec![b"ab.pm", b"b.pm", b"a.pm"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec![&b"a.pm"[..], &b"b.pm"[..], &b"ab.pm"[..]]);
    }
}
