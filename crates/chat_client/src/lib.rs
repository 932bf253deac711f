pub mod client;
pub mod decode;
pub mod error;
pub mod printer;
pub mod transport;

pub use client::{
    ChatClient, DocumentSource, IgnoredReason, NoopObserver, SendOutcome, TranscriptObserver,
    FALLBACK_REPLY,
};
pub use decode::Utf8ChunkDecoder;
pub use error::ClientError;
pub use printer::DeltaPrinter;
pub use transport::{ChunkStream, HttpRelayTransport, RelayTransport};
