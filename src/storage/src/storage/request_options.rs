// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The default number of part uploads in flight for one large file.
pub(crate) const DEFAULT_CONCURRENCY: usize = 4;

/// Options shared by the upload operations.
///
/// The client builder sets the defaults, and each upload may override them.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RequestOptions {
    /// Overrides the part size recommended by the service.
    pub part_size: Option<u64>,
    /// The maximum number of part uploads in flight.
    pub concurrency: usize,
    /// Cancel large files started by the client when an upload fails.
    pub cancel_on_error: bool,
}

impl RequestOptions {
    pub(crate) fn new() -> Self {
        Self {
            part_size: None,
            concurrency: DEFAULT_CONCURRENCY,
            cancel_on_error: true,
        }
    }

    pub(crate) fn set_concurrency(&mut self, v: usize) {
        self.concurrency = v.max(1);
    }
}
