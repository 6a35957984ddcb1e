// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::transform::{ContentTransform, TransformError},
    std::{cell::Cell, rc::Rc},
};

/// A transform that prefixes content and counts invocations.
pub struct CountingTransform {
    pub calls: Rc<Cell<usize>>,
    pub parameters: Vec<u8>,
}

impl CountingTransform {
    pub fn new(calls: Rc<Cell<usize>>) -> Self {
        Self {
            calls,
            parameters: b"counting".to_vec(),
        }
    }
}

impl ContentTransform for CountingTransform {
    fn parameters(&self) -> Vec<u8> {
        self.parameters.clone()
    }

    fn transform(&mut self, _name: &str, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.calls.set(self.calls.get() + 1);

        let mut res = b"counted:".to_vec();
        res.extend(data);

        Ok(res)
    }
}

/// A transform that always fails.
pub struct FailingTransform;

impl ContentTransform for FailingTransform {
    fn parameters(&self) -> Vec<u8> {
        b"failing".to_vec()
    }

    fn transform(&mut self, name: &str, _data: &[u8]) -> Result<Vec<u8>, TransformError> {
        Err(TransformError::Parse {
            name: name.to_string(),
            message: "unexpected token".to_string(),
        })
    }
}
