// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Packing of resources into a contiguous buffer and index. */

use {
    crate::{
        parser::{find_in_index, resolve_entry, PackedResourcesView},
        resource::{compare_names, Resource},
        serialization::{IndexEntry, HEADER_V1, MAX_BUFFER_SIZE, MAX_NAME_LENGTH},
    },
    byteorder::{LittleEndian, WriteBytesExt},
    std::io::Write,
};

/// Errors that prevent a set of resources from being packed.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("resource names must not be empty")]
    EmptyName,

    #[error("resource name {name} is {length} bytes; names may not exceed 128 bytes")]
    NameTooLong { name: String, length: usize },

    #[error("resource {0} is defined more than once")]
    DuplicateName(String),

    #[error("bundle too large: {size} bytes; packed data must be smaller than 32 MiB")]
    TooLarge { size: usize },
}

/// A packed buffer and the index describing it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedResources {
    data: Vec<u8>,
    index: Vec<IndexEntry>,
}

impl PackedResources {
    /// The concatenated `name ++ payload` buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The index, including the terminal entry.
    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.index.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the payload of a resource by name.
    pub fn find(&self, name: &[u8]) -> Option<&[u8]> {
        find_in_index(&self.index, &self.data, name)
    }

    /// Iterate over `(name, payload)` pairs in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        (0..self.len()).filter_map(move |i| resolve_entry(&self.index, &self.data, i))
    }

    /// Obtain a borrowed view, as a consumer of a serialized blob would see it.
    pub fn view(&self) -> PackedResourcesView<'_> {
        PackedResourcesView::from_parts(self.index.clone(), &self.data)
    }

    /// Write the standalone serialized form of this instance.
    ///
    /// See the [crate::specifications] module for the layout.
    pub fn write_blob<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(HEADER_V1)?;
        dest.write_u32::<LittleEndian>(self.len() as u32)?;

        for entry in &self.index {
            dest.write_u32::<LittleEndian>(entry.raw())?;
        }

        dest.write_all(&self.data)?;

        Ok(())
    }

    /// Obtain the standalone serialized form of this instance.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut res =
            Vec::with_capacity(HEADER_V1.len() + 4 + 4 * self.index.len() + self.data.len());
        self.write_blob(&mut res)
            .expect("writing to a Vec should not fail");

        res
    }
}

/// Pack resources into a buffer and index.
///
/// Resources are ordered by [compare_names]. Every entry records where its
/// name begins; a terminal entry records the end of the buffer so the
/// length of the last payload can be derived.
pub fn pack_resources<'a, I>(resources: I) -> Result<PackedResources, PackError>
where
    I: IntoIterator<Item = Resource<'a>>,
{
    let mut resources = resources.into_iter().collect::<Vec<_>>();
    resources.sort_by(|a, b| compare_names(&a.name, &b.name));

    for resource in &resources {
        if resource.name.is_empty() {
            return Err(PackError::EmptyName);
        }

        if resource.name.len() > MAX_NAME_LENGTH {
            return Err(PackError::NameTooLong {
                name: String::from_utf8_lossy(&resource.name).to_string(),
                length: resource.name.len(),
            });
        }
    }

    if let Some(pair) = resources.windows(2).find(|pair| pair[0].name == pair[1].name) {
        return Err(PackError::DuplicateName(
            String::from_utf8_lossy(&pair[0].name).to_string(),
        ));
    }

    let size = resources.iter().map(|r| r.packed_length()).sum::<usize>();
    if size >= MAX_BUFFER_SIZE {
        return Err(PackError::TooLarge { size });
    }

    let mut data = Vec::with_capacity(size);
    let mut index = Vec::with_capacity(resources.len() + 1);

    for resource in &resources {
        index.push(
            IndexEntry::new(resource.name.len(), data.len())
                .ok_or(PackError::TooLarge { size })?,
        );
        data.extend_from_slice(&resource.name);
        data.extend_from_slice(&resource.payload);
    }

    index.push(IndexEntry::terminal(data.len()).ok_or(PackError::TooLarge { size })?);

    Ok(PackedResources { data, index })
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result};

    fn resource<'a>(name: &'a str, payload: &'a str) -> Resource<'a> {
        Resource::new(name.as_bytes(), payload.as_bytes())
    }

    #[test]
    fn test_pack_empty() -> Result<()> {
        let packed = pack_resources(vec![])?;

        assert!(packed.is_empty());
        assert!(packed.data().is_empty());
        assert_eq!(packed.index(), &[IndexEntry::terminal(0).unwrap()]);
        assert_eq!(packed.find(b"strict.pm"), None);

        Ok(())
    }

    #[test]
    fn test_pack_ordering() -> Result<()> {
        let packed = pack_resources(vec![
            resource("ab.pm", "AB"),
            resource("b.pm", "B"),
            resource("a.pm", "A"),
        ])?;

        let names = packed.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, vec![&b"a.pm"[..], &b"b.pm"[..], &b"ab.pm"[..]]);

        assert_eq!(packed.data(), b"a.pmAb.pmBab.pmAB");
        assert_eq!(
            packed.index().iter().map(|e| e.raw()).collect::<Vec<_>>(),
            vec![3 << 25, (3 << 25) | 5, (4 << 25) | 10, 17]
        );

        assert_eq!(packed.find(b"a.pm"), Some(&b"A"[..]));
        assert_eq!(packed.find(b"b.pm"), Some(&b"B"[..]));
        assert_eq!(packed.find(b"ab.pm"), Some(&b"AB"[..]));
        assert_eq!(packed.find(b"c.pm"), None);

        Ok(())
    }

    #[test]
    fn test_empty_payload() -> Result<()> {
        let packed = pack_resources(vec![resource("x", ""), resource("y", "why")])?;

        assert_eq!(packed.find(b"x"), Some(&b""[..]));
        assert_eq!(packed.find(b"y"), Some(&b"why"[..]));

        Ok(())
    }

    #[test]
    fn test_name_length_limit() -> Result<()> {
        let name = "n".repeat(128);
        let packed = pack_resources(vec![resource(&name, "ok")])?;
        assert_eq!(packed.find(name.as_bytes()), Some(&b"ok"[..]));
        assert_eq!(packed.index()[0].name_length(), 128);

        let name = "n".repeat(129);
        let err = pack_resources(vec![resource(&name, "ok")]).unwrap_err();
        assert!(matches!(err, PackError::NameTooLong { length: 129, .. }));
        assert!(err.to_string().contains(&name));

        assert!(matches!(
            pack_resources(vec![resource("", "x")]),
            Err(PackError::EmptyName)
        ));

        Ok(())
    }

    #[test]
    fn test_size_limit() -> Result<()> {
        let payload = vec![b'x'; MAX_BUFFER_SIZE - 2];
        let packed = pack_resources(vec![Resource::new(&b"a"[..], &payload[..])])?;
        assert_eq!(packed.data().len(), MAX_BUFFER_SIZE - 1);
        assert_eq!(packed.find(b"a").map(|p| p.len()), Some(MAX_BUFFER_SIZE - 2));

        let payload = vec![b'x'; MAX_BUFFER_SIZE - 1];
        let err = pack_resources(vec![Resource::new(&b"a"[..], &payload[..])]).unwrap_err();
        assert!(matches!(err, PackError::TooLarge { size } if size == MAX_BUFFER_SIZE));
        assert!(err.to_string().starts_with("bundle too large"));

        Ok(())
    }

    #[test]
    fn test_duplicate_name() {
        let err = pack_resources(vec![resource("a.pm", "1"), resource("a.pm", "2")]).unwrap_err();
        assert_eq!(err.to_string(), "resource a.pm is defined more than once");
    }

    #[test]
    fn test_blob_layout() -> Result<()> {
        let packed = pack_resources(vec![resource("a", "1")])?;
        let blob = packed.to_blob();

        let mut expected = b"plbundle\x01".to_vec();
        expected.write_u32::<LittleEndian>(1)?;
        expected.write_u32::<LittleEndian>(0)?;
        expected.write_u32::<LittleEndian>(2)?;
        expected.extend_from_slice(b"a1");

        assert_eq!(blob, expected);

        Ok(())
    }
}
