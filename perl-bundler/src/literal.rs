// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Encoding of arbitrary bytes as C string literals. */

/// Maximum width of a line of emitted literal text.
const MAX_LINE_WIDTH: usize = 78;

fn escape_byte(b: u8) -> String {
    match b {
        b'\n' => "\\n".to_string(),
        b'\t' => "\\t".to_string(),
        // `?` is escaped so trigraphs can never form.
        b'"' | b'\\' | b'?' => format!("\\{:03o}", b),
        0x20..=0x7e => (b as char).to_string(),
        _ => format!("\\{:03o}", b),
    }
}

/// Encode bytes as a sequence of adjacent C string literals.
///
/// Printable ASCII is emitted as is. Newlines and tabs use their short
/// escapes and a newline also ends the current line of output. All other
/// bytes use 3 digit octal escapes, which can't absorb a following digit.
/// Output lines never exceed 78 columns.
pub fn c_string_literal(data: &[u8]) -> String {
    let mut lines = vec![];
    let mut current = String::from("\"");

    for &b in data {
        let escaped = escape_byte(b);

        if current.len() + escaped.len() + 1 > MAX_LINE_WIDTH {
            current.push('"');
            lines.push(std::mem::replace(&mut current, String::from("\"")));
        }

        current.push_str(&escaped);

        if b == b'\n' {
            current.push('"');
            lines.push(std::mem::replace(&mut current, String::from("\"")));
        }
    }

    if current.len() > 1 || lines.is_empty() {
        current.push('"');
        lines.push(current);
    }

    lines.join("\n")
}
