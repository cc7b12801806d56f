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
//! Data sources for uploads.
//!
//! Uploads read their data from a [StreamingSource]: a lazy, finite and
//! non-restartable sequence of chunks. The client pulls chunks as it fills
//! each part, so at most a few parts are held in memory, regardless of the
//! object size.
//!
//! Sources are provided for data in memory ([bytes::Bytes], `&'static str`,
//! `String`, `Vec<u8>`), for local files, and for any [futures::Stream] of
//! chunks. Applications can implement [StreamingSource] for other types.

use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;

/// The lower and (optional) upper bound of a source size, in bytes.
pub type SizeHint = http_body::SizeHint;

/// A single-pass source of upload data.
pub trait StreamingSource {
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the next chunk, or `None` once the data is exhausted.
    ///
    /// Chunks may have any size, the client splits and combines them into
    /// parts.
    fn next(&mut self) -> impl Future<Output = Option<Result<Bytes, Self::Error>>> + Send;

    /// An estimate of the data size.
    ///
    /// With an exact size the client chooses between a single request and a
    /// large file before reading any data. Otherwise it reads one part first.
    fn size_hint(&self) -> impl Future<Output = Result<SizeHint, Self::Error>> + Send {
        std::future::ready(Ok(SizeHint::new()))
    }

    /// Moves the source to `offset`, counted from the start of the data.
    ///
    /// Called once, before the first `next()`, when a large file is resumed.
    /// Returns `false` if the source cannot jump ahead, in which case the
    /// client reads and discards the bytes already uploaded. Sources that
    /// can jump ahead must fail if the data ends before `offset`.
    fn skip_to(&mut self, offset: u64) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let _ = offset;
        std::future::ready(Ok(false))
    }
}

/// The data of an upload, see [Storage::upload_object].
///
/// [Storage::upload_object]: crate::client::Storage::upload_object
pub struct Payload<T> {
    source: T,
}

impl<T> Payload<T>
where
    T: StreamingSource,
{
    pub fn from_stream(source: T) -> Self {
        Self { source }
    }
}

impl<T> StreamingSource for Payload<T>
where
    T: StreamingSource,
{
    type Error = T::Error;

    fn next(&mut self) -> impl Future<Output = Option<Result<Bytes, Self::Error>>> + Send {
        self.source.next()
    }

    fn size_hint(&self) -> impl Future<Output = Result<SizeHint, Self::Error>> + Send {
        self.source.size_hint()
    }

    fn skip_to(&mut self, offset: u64) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        self.source.skip_to(offset)
    }
}

impl<S> From<S> for Payload<S>
where
    S: StreamingSource,
{
    fn from(source: S) -> Self {
        Self { source }
    }
}

impl From<Bytes> for Payload<BytesSource> {
    fn from(value: Bytes) -> Self {
        Self::from(BytesSource::new(value))
    }
}

impl From<&'static str> for Payload<BytesSource> {
    fn from(value: &'static str) -> Self {
        Self::from(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for Payload<BytesSource> {
    fn from(value: String) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<Vec<u8>> for Payload<BytesSource> {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<tokio::fs::File> for Payload<FileSource> {
    fn from(value: tokio::fs::File) -> Self {
        Self::from(FileSource::new(value))
    }
}

/// Data held in memory.
///
/// The data is returned as a single chunk, the client slices it into parts
/// without copying.
#[derive(Clone, Debug)]
pub struct BytesSource {
    data: Option<Bytes>,
    len: u64,
}

impl BytesSource {
    pub fn new(data: Bytes) -> Self {
        let len = data.len() as u64;
        Self {
            data: Some(data),
            len,
        }
    }
}

impl StreamingSource for BytesSource {
    type Error = Infallible;

    fn next(&mut self) -> impl Future<Output = Option<Result<Bytes, Self::Error>>> + Send {
        let chunk = self.data.take().filter(|d| !d.is_empty());
        std::future::ready(chunk.map(Ok))
    }

    fn size_hint(&self) -> impl Future<Output = Result<SizeHint, Self::Error>> + Send {
        std::future::ready(Ok(SizeHint::with_exact(self.len)))
    }
}

/// Adapts a [Stream] of chunks.
///
/// The size is unknown unless set with [with_size][StreamSource::with_size].
///
/// # Example
/// ```
/// # use b2_storage::upload_source::{Payload, StreamSource};
/// let chunks = ["hello ", "world"]
///     .map(|s| Ok::<_, std::io::Error>(bytes::Bytes::from_static(s.as_bytes())));
/// let source = StreamSource::new(futures::stream::iter(chunks)).with_size(11);
/// let payload = Payload::from(source);
/// ```
pub struct StreamSource<S> {
    stream: S,
    size: Option<u64>,
}

impl<S> StreamSource<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, size: None }
    }

    /// Sets the exact size of the data.
    pub fn with_size(mut self, v: u64) -> Self {
        self.size = Some(v);
        self
    }
}

impl<S, E> StreamingSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn next(&mut self) -> impl Future<Output = Option<Result<Bytes, Self::Error>>> + Send {
        futures::StreamExt::next(&mut self.stream)
    }

    fn size_hint(&self) -> impl Future<Output = Result<SizeHint, Self::Error>> + Send {
        let hint = self.size.map_or_else(SizeHint::new, SizeHint::with_exact);
        std::future::ready(Ok(hint))
    }
}

const DEFAULT_FILE_CHUNK: usize = 1024 * 1024;

/// Reads a local file.
///
/// Resuming an upload seeks the file past the bytes already uploaded.
pub struct FileSource {
    file: tokio::fs::File,
    chunk_size: usize,
}

impl FileSource {
    pub fn new(file: tokio::fs::File) -> Self {
        Self {
            file,
            chunk_size: DEFAULT_FILE_CHUNK,
        }
    }

    /// Changes the size of each read, 1 MiB by default.
    pub fn with_chunk_size(mut self, v: usize) -> Self {
        self.chunk_size = v.max(1);
        self
    }
}

impl StreamingSource for FileSource {
    type Error = std::io::Error;

    async fn next(&mut self) -> Option<Result<Bytes, Self::Error>> {
        use tokio::io::AsyncReadExt;
        let mut buffer = bytes::BytesMut::with_capacity(self.chunk_size);
        match self.file.read_buf(&mut buffer).await {
            Err(e) => Some(Err(e)),
            Ok(0) => None,
            Ok(_) => Some(Ok(buffer.freeze())),
        }
    }

    async fn size_hint(&self) -> Result<SizeHint, Self::Error> {
        let metadata = self.file.metadata().await?;
        Ok(SizeHint::with_exact(metadata.len()))
    }

    async fn skip_to(&mut self, offset: u64) -> Result<bool, Self::Error> {
        use tokio::io::AsyncSeekExt;
        let len = self.file.metadata().await?.len();
        if offset > len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("cannot resume at byte {offset}, the file has {len} bytes"),
            ));
        }
        let _ = self.file.seek(std::io::SeekFrom::Start(offset)).await?;
        Ok(true)
    }
}
