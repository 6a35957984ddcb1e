// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Perl Packaging Implemented in Rust

This crate exposes functionality for discovering the resources a Perl
program needs (modules, autoload stubs, static extension archives),
filtering them, and transforming their content before they are packed
with the `perl-packed-resources` crate.
*/

pub mod autoload;
pub mod cache;
pub mod filtering;
pub mod module_util;
pub mod packlist;
pub mod resource;
pub mod scanning;
pub mod transform;

#[cfg(test)]
mod testutil;
