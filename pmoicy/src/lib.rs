//! # pmoicy - ICY metadata client for Icecast/Shoutcast streams
//!
//! Internet radio servers can interleave "now playing" information inside the
//! audio stream: after every `icy-metaint` bytes of audio comes one length
//! byte and a short `StreamTitle='...';` text block. `pmoicy` negotiates this
//! feature, removes the metadata from the audio and publishes each parsed
//! block on a side channel.
//!
//! ## Features
//!
//! - **Negotiation**: sends `Icy-MetaData: 1` on request and reads `icy-metaint`
//! - **Clean audio**: [`IcySession`] implements Tokio's `AsyncRead` and yields
//!   the audio bytes only, in order, byte for byte
//! - **Non-blocking metadata**: snapshots go through a single-slot mailbox; a
//!   slow or absent subscriber never stalls the audio path
//! - **Strict framing**: a truncated stream is reported as an error, never as
//!   silent end of data
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmoicy::{IcyClient, IcyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = IcyClient::from_config(&IcyConfig::with_metadata())?;
//!     let mut session = client.connect("http://radio.example.com/stream").await?;
//!
//!     println!("Station: {:?}", session.icy().name);
//!
//!     let mut metadata = session.take_metadata();
//!     let mut sink = tokio::io::sink();
//!     tokio::spawn(async move { tokio::io::copy(&mut session, &mut sink).await });
//!
//!     if let Some(metadata) = metadata.as_mut() {
//!         while let Some(meta) = metadata.recv().await {
//!             println!("Now playing: {}", meta.stream_title().unwrap_or("?"));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Using the decoder directly
//!
//! [`IcyMetadataReader`] works over any `AsyncRead`, not only HTTP bodies:
//!
//! ```
//! use std::num::NonZeroUsize;
//! use pmoicy::IcyMetadataReader;
//! use tokio::io::AsyncReadExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::io::Result<()> {
//! let mut wire = b"AAAA\x01".to_vec();
//! wire.extend_from_slice(b"title='x';\0\0\0\0\0\0");
//! wire.extend_from_slice(b"BBBB\x00");
//!
//! let (mut reader, mut metadata) =
//!     IcyMetadataReader::new(wire.as_slice(), NonZeroUsize::new(4).unwrap());
//!
//! let mut audio = Vec::new();
//! reader.read_to_end(&mut audio).await?;
//! assert_eq!(audio, b"AAAABBBB");
//! assert_eq!(metadata.try_recv().unwrap().get("title"), Some("x"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod mailbox;
pub mod metadata;
pub mod reader;
pub mod session;

// Re-exports
pub use client::{connect, ClientBuilder, IcyClient};
pub use config::IcyConfig;
pub use error::{Error, FramingError, Result};
pub use headers::IcyHeaders;
pub use mailbox::TryRecvError;
pub use metadata::{parse_metadata_block, IcyMetadata};
pub use reader::{IcyMetadataReader, MetadataReceiver, MetadataSender};
pub use session::{IcySession, SessionBody};
