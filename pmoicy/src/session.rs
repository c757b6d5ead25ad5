//! An open ICY stream.

use std::{
    io,
    num::NonZeroUsize,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::{header::HeaderMap, StatusCode};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::headers::IcyHeaders;
use crate::reader::{IcyMetadataReader, MetadataReceiver};

/// HTTP response body as an `AsyncRead`
pub type BodyReader = StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>;

/// Audio side of a session: the raw body, or the body with metadata removed.
pub enum SessionBody {
    Raw(BodyReader),
    Interleaved(IcyMetadataReader<BodyReader>),
}

impl SessionBody {
    /// Whether metadata is being stripped from this body
    pub fn is_interleaved(&self) -> bool {
        matches!(self, SessionBody::Interleaved(_))
    }
}

impl AsyncRead for SessionBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SessionBody::Raw(reader) => Pin::new(reader).poll_read(cx, buf),
            SessionBody::Interleaved(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

impl std::fmt::Debug for SessionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionBody::Raw(_) => f.write_str("SessionBody::Raw"),
            SessionBody::Interleaved(reader) => {
                f.debug_tuple("SessionBody::Interleaved").field(reader).finish()
            }
        }
    }
}

/// A connected stream, as negotiated by [`IcyClient::connect`](crate::IcyClient::connect).
///
/// Reading from the session yields audio bytes only. When metadata was
/// negotiated, snapshots are available through [`metadata`](Self::metadata)
/// or [`take_metadata`](Self::take_metadata). Dropping the session (or
/// calling [`close`](Self::close)) closes the connection, which also ends the
/// metadata receiver.
#[derive(Debug)]
pub struct IcySession {
    pub(crate) url: Url,
    pub(crate) request_headers: HeaderMap,
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) icy: IcyHeaders,
    pub(crate) metaint: Option<NonZeroUsize>,
    pub(crate) body: SessionBody,
    pub(crate) metadata: Option<MetadataReceiver>,
}

impl IcySession {
    /// URL that was requested
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers of the request that was sent
    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Station information from the `icy-*` response headers
    pub fn icy(&self) -> &IcyHeaders {
        &self.icy
    }

    /// Negotiated metadata interval, `None` when the body is passed through
    pub fn metaint(&self) -> Option<usize> {
        self.metaint.map(NonZeroUsize::get)
    }

    /// Metadata receiver, if metadata was negotiated and not taken yet
    pub fn metadata(&mut self) -> Option<&mut MetadataReceiver> {
        self.metadata.as_mut()
    }

    /// Move the metadata receiver out, e.g. into a subscriber task
    pub fn take_metadata(&mut self) -> Option<MetadataReceiver> {
        self.metadata.take()
    }

    /// Split into the audio body and the metadata receiver
    pub fn into_parts(self) -> (SessionBody, Option<MetadataReceiver>) {
        (self.body, self.metadata)
    }

    /// Close the connection.
    ///
    /// Takes the session by value, so no read can be in progress when it is
    /// called; to stop a read blocked in another task, drop or abort that
    /// task instead. Any receiver taken from this session returns `None`
    /// once drained.
    pub fn close(self) {
        debug!("Closing ICY session for {}", self.url);
        drop(self);
    }
}

impl AsyncRead for IcySession {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_read(cx, buf)
    }
}
