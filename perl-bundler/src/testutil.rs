// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Whether a `perl` executable can be found in PATH.
pub fn perl_in_path() -> bool {
    duct::cmd("perl", &["-e", "1"])
        .stdout_null()
        .stderr_null()
        .run()
        .is_ok()
}
