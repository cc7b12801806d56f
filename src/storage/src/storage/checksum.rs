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

//! Checksums over uploaded data and the large file manifest.

use crate::error::ManifestError;
use crate::model::Part;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Computes the SHA-1 of a byte stream, as required by the service.
///
/// The data may be fed in chunks of any size. Chunks carry their offset in
/// the stream, data that was already included in the checksum (for example,
/// a chunk that is sent again after a failure) is skipped.
#[derive(Clone, Default)]
pub struct Sha1Accumulator {
    hasher: Sha1,
    offset: u64,
}

impl Sha1Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes `data`, which starts at `offset` in the stream.
    pub fn update(&mut self, offset: u64, data: &bytes::Bytes) {
        let end = offset + data.len() as u64;
        if (offset..end).contains(&self.offset) {
            let data = data.slice((self.offset - offset) as usize..);
            self.hasher.update(&data);
            self.offset = end;
        }
    }

    /// The number of bytes included so far.
    pub fn len(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// The hex encoded checksum.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl std::fmt::Debug for Sha1Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha1Accumulator")
            .field("hasher", &"[skipped]")
            .field("offset", &self.offset)
            .finish()
    }
}

/// The parts uploaded for a large file, indexed by part number.
///
/// Parts may be recorded in any order, the manifest is always iterated in
/// ascending part number order. Recording a part number twice replaces the
/// previous entry, matching the service behavior when a part is uploaded
/// again.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Manifest {
    parts: BTreeMap<u32, Part>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `part`, returning the previous part with the same number.
    pub fn insert(&mut self, part: Part) -> Option<Part> {
        self.parts.insert(part.part_number, part)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The largest recorded part number.
    pub fn last_part_number(&self) -> Option<u32> {
        self.parts.keys().next_back().copied()
    }

    /// The recorded parts, in ascending part number order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// The total number of bytes in the recorded parts.
    pub fn total_len(&self) -> u64 {
        self.parts.values().map(|p| p.content_length).sum()
    }

    /// Verifies the parts are contiguous, starting at 1.
    pub fn check_contiguous(&self) -> Result<(), ManifestError> {
        match (1_u32..)
            .zip(self.parts.keys())
            .find(|(want, got)| *want != **got)
        {
            Some((missing, _)) => Err(ManifestError::MissingPart(missing)),
            None => Ok(()),
        }
    }

    /// Removes the parts after the first missing part number, returning them.
    pub fn truncate_at_gap(&mut self) -> Vec<Part> {
        let Err(ManifestError::MissingPart(missing)) = self.check_contiguous() else {
            return Vec::new();
        };
        self.parts.split_off(&missing).into_values().collect()
    }

    /// Returns the checksums to finish the large file, in part number order.
    ///
    /// Fails if the manifest is empty, has gaps, or if any part but the last is
    /// smaller than `minimum_part_size`.
    pub fn validate(&self, minimum_part_size: u64) -> Result<Vec<String>, ManifestError> {
        if self.parts.is_empty() {
            return Err(ManifestError::Empty);
        }
        self.check_contiguous()?;
        let last = self.parts.len();
        let undersized = self
            .parts
            .values()
            .take(last - 1)
            .find(|p| p.content_length < minimum_part_size);
        if let Some(p) = undersized {
            return Err(ManifestError::UndersizedPart {
                part_number: p.part_number,
                length: p.content_length,
                minimum: minimum_part_size,
            });
        }
        Ok(self
            .parts
            .values()
            .map(|p| p.content_sha1.clone())
            .collect())
    }
}
