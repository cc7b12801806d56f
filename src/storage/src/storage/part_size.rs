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

//! Decides how to upload an object, and how to split it into parts.
//!
//! The decision is a pure function of the object size and the service limits.
//! It is made once, before any upload request, and never changes mid-upload.

use crate::error::UploadError;
use crate::{Error, Result};
use b2_auth::session::Session;

/// The largest object that can be uploaded in a single request (5 GB).
///
/// This is also the largest part of a large file.
pub const MAX_SINGLE_SHOT_SIZE: u64 = 5_000_000_000;

/// The largest large file (10 TB).
pub const MAX_LARGE_FILE_SIZE: u64 = 10_000_000_000_000;

/// The maximum number of parts in a large file.
pub const MAX_PART_COUNT: u64 = 10_000;

/// The size limits used to plan an upload.
///
/// The recommended and minimum part sizes are advertised by the service when
/// the account is authorized. The recommended size is clamped to the
/// `[minimum, MAX_SINGLE_SHOT_SIZE]` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartSizeLimits {
    recommended: u64,
    minimum: u64,
    single_shot_maximum: u64,
    large_file_maximum: u64,
}

impl PartSizeLimits {
    pub fn new(recommended: u64, minimum: u64) -> Self {
        let minimum = minimum.clamp(1, MAX_SINGLE_SHOT_SIZE);
        Self {
            recommended: recommended.clamp(minimum, MAX_SINGLE_SHOT_SIZE),
            minimum,
            single_shot_maximum: MAX_SINGLE_SHOT_SIZE,
            large_file_maximum: MAX_LARGE_FILE_SIZE,
        }
    }

    /// The limits advertised in `session`.
    pub fn from_session(session: &Session) -> Self {
        Self::new(
            session.recommended_part_size,
            session.absolute_minimum_part_size,
        )
    }

    /// Overrides the recommended part size, still subject to the minimum.
    pub fn with_part_size(self, part_size: Option<u64>) -> Self {
        match part_size {
            Some(p) => Self::new(p, self.minimum),
            None => self,
        }
    }

    pub fn recommended(&self) -> u64 {
        self.recommended
    }

    pub fn minimum(&self) -> u64 {
        self.minimum
    }

    pub fn single_shot_maximum(&self) -> u64 {
        self.single_shot_maximum
    }

    pub fn large_file_maximum(&self) -> u64 {
        self.large_file_maximum
    }
}

/// How to upload an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Upload the object in a single request.
    SingleShot,
    /// Upload the object as a large file.
    Multipart {
        /// The size of every part except the last.
        part_size: u64,
        /// The number of parts.
        part_count: u64,
    },
}

impl UploadStrategy {
    /// The parts of an object with `size` bytes.
    ///
    /// A single-shot upload has exactly one range, covering the full object.
    pub fn boundaries(&self, size: u64) -> PartBoundaries {
        match self {
            Self::SingleShot => PartBoundaries::new(size, size.max(1)),
            Self::Multipart { part_size, .. } => PartBoundaries::new(size, *part_size),
        }
    }
}

/// Chooses the upload strategy for an object with `size` bytes.
///
/// Objects up to the recommended part size (and the single-shot maximum) use
/// a single request. Larger objects use a large file, with parts of the
/// recommended size. The part size grows if needed to keep the part count
/// within [MAX_PART_COUNT]. Objects larger than the large file maximum are
/// rejected with an error where [is_invalid_size()][Error::is_invalid_size]
/// is true.
///
/// # Example
/// ```
/// # use b2_storage::part_size::{plan, PartSizeLimits, UploadStrategy};
/// const MIB: u64 = 1024 * 1024;
/// let limits = PartSizeLimits::new(5 * MIB, 5 * MIB);
/// assert_eq!(plan(4 * MIB, &limits)?, UploadStrategy::SingleShot);
/// assert_eq!(
///     plan(12 * MIB, &limits)?,
///     UploadStrategy::Multipart { part_size: 5 * MIB, part_count: 3 }
/// );
/// # Ok::<(), b2_storage::Error>(())
/// ```
pub fn plan(size: u64, limits: &PartSizeLimits) -> Result<UploadStrategy> {
    if size <= limits.single_shot_maximum && size <= limits.recommended {
        return Ok(UploadStrategy::SingleShot);
    }
    if (limits.minimum..=limits.large_file_maximum).contains(&size) {
        let part_size = limits.recommended.max(size.div_ceil(MAX_PART_COUNT));
        return Ok(UploadStrategy::Multipart {
            part_size,
            part_count: size.div_ceil(part_size),
        });
    }
    Err(Error::invalid_size(UploadError::TooLarge {
        size,
        max: limits.large_file_maximum,
    }))
}

/// One part of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartRange {
    /// The 1-based part number.
    pub part_number: u32,
    /// The offset of the first byte of the part.
    pub offset: u64,
    /// The part size, in bytes.
    pub length: u64,
}

/// An iterator over the parts of an object.
///
/// Every part has `part_size` bytes, except possibly the last one. An empty
/// object has no parts.
#[derive(Clone, Debug)]
pub struct PartBoundaries {
    size: u64,
    part_size: u64,
    offset: u64,
    part_number: u32,
}

impl PartBoundaries {
    pub fn new(size: u64, part_size: u64) -> Self {
        Self {
            size,
            part_size: part_size.max(1),
            offset: 0,
            part_number: 1,
        }
    }
}

impl Iterator for PartBoundaries {
    type Item = PartRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.size {
            return None;
        }
        let length = self.part_size.min(self.size - self.offset);
        let range = PartRange {
            part_number: self.part_number,
            offset: self.offset,
            length,
        };
        self.offset += length;
        self.part_number += 1;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.size - self.offset.min(self.size)).div_ceil(self.part_size);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const MIB: u64 = 1024 * 1024;

    fn limits() -> PartSizeLimits {
        PartSizeLimits::new(5 * MIB, 5 * MIB)
    }

    #[test_case(0, UploadStrategy::SingleShot; "empty")]
    #[test_case(1, UploadStrategy::SingleShot; "one byte")]
    #[test_case(5 * MIB, UploadStrategy::SingleShot; "exactly recommended")]
    #[test_case(5 * MIB + 1, UploadStrategy::Multipart { part_size: 5 * MIB, part_count: 2 }; "just above recommended")]
    #[test_case(12 * MIB, UploadStrategy::Multipart { part_size: 5 * MIB, part_count: 3 }; "happy path")]
    #[test_case(15 * MIB, UploadStrategy::Multipart { part_size: 5 * MIB, part_count: 3 }; "exact multiple")]
    fn strategy(size: u64, want: UploadStrategy) -> anyhow::Result<()> {
        let got = plan(size, &limits())?;
        assert_eq!(got, want);
        // The decision is deterministic.
        assert_eq!(plan(size, &limits())?, got);
        Ok(())
    }

    #[test]
    fn part_count_limit() -> anyhow::Result<()> {
        // 100 GB with 5 MiB parts would need about 19,000 parts.
        let size = 100_000_000_000_u64;
        let got = plan(size, &limits())?;
        let UploadStrategy::Multipart {
            part_size,
            part_count,
        } = got
        else {
            panic!("expected a multipart strategy, got {got:?}");
        };
        assert_eq!(part_size, 10_000_000);
        assert_eq!(part_count, MAX_PART_COUNT);
        Ok(())
    }

    #[test]
    fn largest_object() -> anyhow::Result<()> {
        let got = plan(MAX_LARGE_FILE_SIZE, &limits())?;
        assert!(
            matches!(got, UploadStrategy::Multipart { part_count, .. } if part_count <= MAX_PART_COUNT),
            "{got:?}"
        );
        Ok(())
    }

    #[test]
    fn too_large() {
        let got = plan(MAX_LARGE_FILE_SIZE + 1, &limits());
        assert!(matches!(&got, Err(e) if e.is_invalid_size()), "{got:?}");
    }

    #[test]
    fn recommended_is_clamped() {
        let limits = PartSizeLimits::new(MIB, 5 * MIB);
        assert_eq!(limits.recommended(), 5 * MIB);
        let limits = PartSizeLimits::new(10 * MAX_SINGLE_SHOT_SIZE, 5 * MIB);
        assert_eq!(limits.recommended(), MAX_SINGLE_SHOT_SIZE);
        let limits = limits.with_part_size(Some(1));
        assert_eq!(limits.recommended(), 5 * MIB);
        let limits = limits.with_part_size(None);
        assert_eq!(limits.recommended(), 5 * MIB);
    }

    #[test]
    fn objects_above_single_shot_maximum_use_multipart() -> anyhow::Result<()> {
        let limits = PartSizeLimits::new(MAX_SINGLE_SHOT_SIZE, 5 * MIB);
        let got = plan(MAX_SINGLE_SHOT_SIZE + 1, &limits)?;
        assert_eq!(
            got,
            UploadStrategy::Multipart {
                part_size: MAX_SINGLE_SHOT_SIZE,
                part_count: 2
            }
        );
        Ok(())
    }

    #[test]
    fn boundaries() {
        let strategy = plan(12 * MIB, &limits()).unwrap();
        let got = strategy.boundaries(12 * MIB).collect::<Vec<_>>();
        let want = vec![
            PartRange {
                part_number: 1,
                offset: 0,
                length: 5 * MIB,
            },
            PartRange {
                part_number: 2,
                offset: 5 * MIB,
                length: 5 * MIB,
            },
            PartRange {
                part_number: 3,
                offset: 10 * MIB,
                length: 2 * MIB,
            },
        ];
        assert_eq!(got, want);
    }

    #[test_case(0, 5, 0)]
    #[test_case(1, 5, 1)]
    #[test_case(10, 5, 2)]
    #[test_case(11, 5, 3)]
    fn boundaries_count(size: u64, part_size: u64, want: usize) {
        let boundaries = PartBoundaries::new(size, part_size);
        assert_eq!(boundaries.size_hint(), (want, Some(want)));
        let got = boundaries.collect::<Vec<_>>();
        assert_eq!(got.len(), want);
        assert_eq!(got.iter().map(|r| r.length).sum::<u64>(), size);
    }

    #[test]
    fn single_shot_boundaries() {
        let got = UploadStrategy::SingleShot.boundaries(42).collect::<Vec<_>>();
        assert_eq!(
            got,
            vec![PartRange {
                part_number: 1,
                offset: 0,
                length: 42
            }]
        );
    }
}
