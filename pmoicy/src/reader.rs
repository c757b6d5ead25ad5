//! Decoder for streams with interleaved ICY metadata.
//!
//! Wire layout, repeated until the stream ends:
//!
//! ```text
//! [ metaint audio bytes ][ L: u8 ][ L * 16 metadata bytes ]
//! ```
//!
//! `L == 0` means no metadata this interval. [`IcyMetadataReader`] strips the
//! length byte and the block, yields audio only, and publishes each parsed
//! block to a [`MetadataReceiver`].

use std::{
    io,
    num::NonZeroUsize,
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, warn};

use crate::{
    error::FramingError,
    mailbox,
    metadata::{parse_metadata_block, IcyMetadata, MAX_METADATA_LEN},
};

/// Publishing side of the metadata mailbox
pub type MetadataSender = mailbox::Sender<IcyMetadata>;

/// Subscriber side of the metadata mailbox
pub type MetadataReceiver = mailbox::Receiver<IcyMetadata>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadState {
    /// Deliver `chunk[pos..]` to the caller.
    DrainPending { pos: usize },
    /// Fill `chunk` from the source, `filled` bytes so far.
    ReadAudioChunk { filled: usize },
    ReadMetaLength,
    /// Fill `meta[..len]`, `filled` bytes so far.
    ReadMetaBlock { len: usize, filled: usize },
    /// Source ended on a chunk boundary.
    Eof,
    Failed(FramingError),
}

/// `AsyncRead` adapter that removes ICY metadata from an audio stream.
///
/// The wrapped source is owned exclusively. Each caller read returns pending
/// audio first; when nothing is pending, one full interval (audio chunk,
/// length byte, metadata block) is read before delivering, so metadata bytes
/// never reach the caller. A single caller read may therefore issue several
/// reads on the source.
///
/// A source that ends anywhere but on a chunk boundary yields an
/// [`io::ErrorKind::UnexpectedEof`] error carrying a [`FramingError`]; the
/// reader stays failed afterwards. Other I/O errors are passed through as-is
/// and the read can be retried.
pub struct IcyMetadataReader<R> {
    inner: R,
    chunk: Box<[u8]>,
    meta: Box<[u8]>,
    state: ReadState,
    sender: Option<MetadataSender>,
    blocks: u64,
}

impl<R> IcyMetadataReader<R> {
    /// Wrap `inner`, whose audio is interrupted every `metaint` bytes.
    ///
    /// Returns the reader and the receiving side of its metadata mailbox.
    pub fn new(inner: R, metaint: NonZeroUsize) -> (Self, MetadataReceiver) {
        let (sender, receiver) = mailbox::channel();
        let reader = Self {
            inner,
            chunk: vec![0; metaint.get()].into_boxed_slice(),
            meta: vec![0; MAX_METADATA_LEN].into_boxed_slice(),
            state: ReadState::ReadAudioChunk { filled: 0 },
            sender: Some(sender),
            blocks: 0,
        };
        (reader, receiver)
    }

    /// Negotiated metadata interval in bytes
    pub fn metaint(&self) -> usize {
        self.chunk.len()
    }

    /// Number of non-empty metadata blocks published so far
    pub fn blocks_published(&self) -> u64 {
        self.blocks
    }

    fn publish(&mut self, len: usize) {
        let snapshot = parse_metadata_block(&self.meta[..len]);
        self.blocks += 1;
        debug!(
            "ICY metadata block #{} ({} bytes): {:?}",
            self.blocks,
            len,
            snapshot.stream_title().unwrap_or("<no StreamTitle>")
        );
        if let Some(sender) = &self.sender {
            sender.publish(snapshot);
        }
    }

    fn fail(&mut self, err: FramingError) -> io::Error {
        warn!("ICY stream framing error: {}", err);
        self.state = ReadState::Failed(err.clone());
        // subscribers see the end of the stream
        self.sender = None;
        err.into()
    }
}

/// Read once into `dst`, returning the number of bytes placed there.
fn poll_read_into<R: AsyncRead + Unpin>(
    reader: &mut R,
    cx: &mut Context<'_>,
    dst: &mut [u8],
) -> Poll<io::Result<usize>> {
    let mut buf = ReadBuf::new(dst);
    ready!(Pin::new(reader).poll_read(cx, &mut buf))?;
    Poll::Ready(Ok(buf.filled().len()))
}

impl<R: AsyncRead + Unpin> AsyncRead for IcyMetadataReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            match this.state.clone() {
                ReadState::DrainPending { pos } => {
                    let pending = &this.chunk[pos..];
                    if pending.is_empty() {
                        this.state = ReadState::ReadAudioChunk { filled: 0 };
                        continue;
                    }
                    let to_copy = pending.len().min(buf.remaining());
                    buf.put_slice(&pending[..to_copy]);
                    this.state = ReadState::DrainPending {
                        pos: pos + to_copy,
                    };
                    return Poll::Ready(Ok(()));
                }
                ReadState::ReadAudioChunk { filled } => {
                    let n = ready!(poll_read_into(
                        &mut this.inner,
                        cx,
                        &mut this.chunk[filled..]
                    ))?;
                    if n == 0 {
                        if filled == 0 {
                            debug!("ICY stream ended after {} metadata blocks", this.blocks);
                            this.state = ReadState::Eof;
                            this.sender = None;
                            return Poll::Ready(Ok(()));
                        }
                        return Poll::Ready(Err(this.fail(FramingError::TruncatedAudio {
                            expected: this.chunk.len(),
                            received: filled,
                        })));
                    }
                    let filled = filled + n;
                    this.state = if filled == this.chunk.len() {
                        ReadState::ReadMetaLength
                    } else {
                        ReadState::ReadAudioChunk { filled }
                    };
                }
                ReadState::ReadMetaLength => {
                    let mut length = [0u8; 1];
                    let n = ready!(poll_read_into(&mut this.inner, cx, &mut length))?;
                    if n == 0 {
                        return Poll::Ready(Err(this.fail(FramingError::TruncatedLength)));
                    }
                    let len = usize::from(length[0]) * 16;
                    this.state = if len == 0 {
                        ReadState::DrainPending { pos: 0 }
                    } else {
                        ReadState::ReadMetaBlock { len, filled: 0 }
                    };
                }
                ReadState::ReadMetaBlock { len, filled } => {
                    let n = ready!(poll_read_into(
                        &mut this.inner,
                        cx,
                        &mut this.meta[filled..len]
                    ))?;
                    if n == 0 {
                        return Poll::Ready(Err(this.fail(FramingError::TruncatedMetadata {
                            expected: len,
                            received: filled,
                        })));
                    }
                    let filled = filled + n;
                    if filled == len {
                        this.publish(len);
                        this.state = ReadState::DrainPending { pos: 0 };
                    } else {
                        this.state = ReadState::ReadMetaBlock { len, filled };
                    }
                }
                ReadState::Eof => return Poll::Ready(Ok(())),
                ReadState::Failed(err) => return Poll::Ready(Err(err.into())),
            }
        }
    }
}

impl<R> std::fmt::Debug for IcyMetadataReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcyMetadataReader")
            .field("metaint", &self.chunk.len())
            .field("state", &self.state)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}
