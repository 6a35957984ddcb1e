// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Perl Packed Resources

This crate defines and implements a data format for storing the resources
a Perl interpreter needs (module source, autoload stubs, arbitrary data
files) in a single contiguous buffer. We call this data format *Perl packed
resources*.

A producer collects named resources, hands them to [pack_resources], and
receives a [PackedResources] holding the concatenated buffer plus an index
of fixed width records. The index is ordered so a consumer can locate a
resource by name with a binary search and without allocating. The same
search is emitted as C code by the `perl-bundler` crate so an embedding
host resolves module names from the buffer at run time.

See the [specifications] module for the canonical description of the
format.
*/

mod parser;
mod resource;
mod serialization;
pub mod specifications;
mod writer;

pub use crate::{
    parser::{find_in_index, PackedResourcesView, ParseError},
    resource::{compare_names, Resource},
    serialization::{
        IndexEntry, HEADER_V1, MAX_BUFFER_SIZE, MAX_NAME_LENGTH, OFFSET_BITS, OFFSET_MASK,
    },
    writer::{pack_resources, PackError, PackedResources},
};
