// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Specifications

# Packed Resources Data

A set of named resources is packed into two parts: a *buffer* holding the
names and content of every resource, and an *index* of fixed width records
used to locate resources in the buffer.

## Ordering

Resources are ordered by the byte length of their name, shortest first.
Names of equal length are ordered by comparing their bytes. e.g.
`a.pm`, `b.pm` and `ab.pm` are ordered `a.pm`, `b.pm`, `ab.pm`.

This order is what makes lookups cheap: a reader compares the length of the
name it is looking for with the length recorded in the index and only
touches the buffer when the lengths are equal.

## Buffer

For each resource, in order, the buffer contains the resource name
immediately followed by the resource content. There is no padding or
terminator between entries.

The buffer must be smaller than 2^25 bytes (32 MiB).

## Index

The index consists of `N + 1` unsigned 32-bit integers for `N` resources.

Entry `i` for `i < N` is `((name_length - 1) << 25) | offset` where
`offset` is the position in the buffer at which resource `i`'s name begins.
Names must therefore be between 1 and 128 bytes long.

Entry `N` holds the length of the buffer in its low 25 bits. Its high bits
are zero and carry no meaning.

The content of resource `i` spans from `offset_i + name_length_i` up to
`offset_{i+1}`.

## Lookup

```text
low = 0
high = N
while low < high:
    mid = (low + high) / 2
    c = query_length - name_length(mid)
    if c == 0:
        c = memcmp(query, buffer + offset(mid), query_length)
    if c < 0:
        high = mid
    elif c > 0:
        low = mid + 1
    else:
        return buffer[offset(mid) + query_length .. offset(mid + 1)]
return not found
```

# Standalone Blob

The buffer and index can be serialized into a single blob. All integers
are little-endian.

* The 9 byte header `plbundle\x01`.
* A `u32` holding `N`, the number of resources.
* `N + 1` `u32` index entries, as described above.
* The buffer.

Readers must verify that the terminal entry equals the length of the
trailing buffer, that entries are contiguous and that names are strictly
increasing in the order defined above.
*/
