// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Functionality for bundling Perl modules into C sources.

perl-bundler gathers Perl modules and their dependencies, packs them into
a compact in-memory index and generates C code serving them to an embedded
Perl interpreter through an `@INC` hook.

This library exposes that functionality to other tools.
*/

pub mod bundling;
pub mod cli;
pub mod embedding;
pub mod environment;
pub mod linking;
pub mod literal;
pub mod logging;
pub mod module_tracer;
pub mod project_building;
pub mod settings;

#[cfg(test)]
mod testutil;
