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

//! Splits a single-pass data source into parts.

use super::checksum::Sha1Accumulator;
use crate::error::UploadError;
use crate::upload_source::StreamingSource;
use crate::{Error, Result};

/// The data of one part (or of a whole small object).
///
/// The data is held as the list of chunks received from the source, no
/// copies are made to assemble the part. The checksum is computed over the
/// same chunks, so it always matches the bytes sent. Cloning a payload is
/// cheap, which allows sending it again after a failure.
#[derive(Clone, Debug, PartialEq)]
pub struct PartPayload {
    chunks: Vec<bytes::Bytes>,
    offset: u64,
    len: u64,
    sha1: String,
}

impl PartPayload {
    fn new(chunks: Vec<bytes::Bytes>, offset: u64) -> Self {
        let mut sha1 = Sha1Accumulator::new();
        let mut position = 0_u64;
        for c in chunks.iter() {
            sha1.update(position, c);
            position += c.len() as u64;
        }
        Self {
            chunks,
            offset,
            len: sha1.len(),
            sha1: sha1.finalize(),
        }
    }

    /// The part size, in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The offset of this part within the object.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The hex encoded SHA-1 of the data.
    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    /// The data, as received from the source.
    pub fn chunks(&self) -> &[bytes::Bytes] {
        &self.chunks
    }

    /// The request body for this payload.
    pub(crate) fn to_body(&self) -> reqwest::Body {
        let chunks = self
            .chunks
            .clone()
            .into_iter()
            .map(Ok::<_, std::io::Error>);
        reqwest::Body::wrap_stream(futures::stream::iter(chunks))
    }
}

impl Default for PartPayload {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl From<bytes::Bytes> for PartPayload {
    fn from(value: bytes::Bytes) -> Self {
        Self::new(vec![value], 0)
    }
}

impl From<&'static str> for PartPayload {
    fn from(value: &'static str) -> Self {
        Self::from(bytes::Bytes::from_static(value.as_bytes()))
    }
}

impl From<Vec<bytes::Bytes>> for PartPayload {
    fn from(value: Vec<bytes::Bytes>) -> Self {
        Self::new(value, 0)
    }
}

/// Produces the parts of an object from a [StreamingSource].
///
/// This is a lazy, finite, non-restartable sequence: each call to
/// [next_part][PartReader::next_part] pulls just enough chunks from the
/// source to fill one part. Chunks that straddle a part boundary are split,
/// the remainder starts the next part.
pub struct PartReader<S> {
    source: S,
    pending: Option<bytes::Bytes>,
    offset: u64,
    exhausted: bool,
}

impl<S> PartReader<S>
where
    S: StreamingSource,
{
    /// Creates a reader for `source`, starting at the beginning of the data.
    pub fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
            offset: 0,
            exhausted: false,
        }
    }

    /// Creates a reader that continues at `offset`.
    ///
    /// Used to resume a large file, `offset` is the number of bytes already
    /// uploaded. Sources that cannot jump ahead are read, and the bytes
    /// before `offset` are discarded. Fails with an error where
    /// [is_invalid_argument()][Error::is_invalid_argument] is true if the
    /// data ends before `offset`.
    pub async fn resume_at(source: S, offset: u64) -> Result<Self> {
        let mut reader = Self::new(source);
        if offset == 0 {
            return Ok(reader);
        }
        if reader.source.skip_to(offset).await.map_err(Error::ser)? {
            reader.offset = offset;
            return Ok(reader);
        }
        while reader.offset < offset {
            let Some(chunk) = reader.source.next().await.transpose().map_err(Error::ser)? else {
                return Err(Error::invalid_argument(UploadError::SourceTooShort {
                    uploaded: offset,
                    got: reader.offset,
                }));
            };
            let wanted = offset - reader.offset;
            if chunk.len() as u64 > wanted {
                reader.pending = Some(chunk.slice(wanted as usize..));
                reader.offset = offset;
            } else {
                reader.offset += chunk.len() as u64;
            }
        }
        Ok(reader)
    }

    /// The offset of the next byte returned by the reader.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the next part, with at most `part_size` bytes.
    ///
    /// Only the last part may be shorter than `part_size`. Returns `None` once
    /// the source is exhausted. Errors reading the source are returned as
    /// errors where [is_serialization()][Error::is_serialization] is true.
    pub async fn next_part(&mut self, part_size: u64) -> Result<Option<PartPayload>> {
        let part_size = part_size.max(1);
        let mut chunks = Vec::new();
        let mut len = 0_u64;
        while len < part_size {
            let chunk = match self.pending.take() {
                Some(c) => c,
                None if self.exhausted => break,
                None => match self.source.next().await.transpose().map_err(Error::ser)? {
                    Some(c) => c,
                    None => {
                        self.exhausted = true;
                        break;
                    }
                },
            };
            if chunk.is_empty() {
                continue;
            }
            let wanted = part_size - len;
            let chunk = if chunk.len() as u64 > wanted {
                let mut head = chunk;
                let tail = head.split_off(wanted as usize);
                self.pending = Some(tail);
                head
            } else {
                chunk
            };
            len += chunk.len() as u64;
            chunks.push(chunk);
        }
        if chunks.is_empty() {
            return Ok(None);
        }
        let payload = PartPayload::new(chunks, self.offset);
        self.offset += payload.len();
        Ok(Some(payload))
    }

    /// Returns true if there is no more data in the source.
    ///
    /// This may need to read one chunk from the source, the chunk is kept for
    /// the next part.
    pub async fn is_exhausted(&mut self) -> Result<bool> {
        if self.pending.as_ref().is_some_and(|p| !p.is_empty()) {
            return Ok(false);
        }
        while !self.exhausted {
            match self.source.next().await.transpose().map_err(Error::ser)? {
                Some(c) if c.is_empty() => continue,
                Some(c) => {
                    self.pending = Some(c);
                    return Ok(false);
                }
                None => self.exhausted = true,
            }
        }
        Ok(true)
    }
}
