pub mod domain;
pub mod ports;
pub mod relay;
pub mod transcript;

pub use domain::{
    AuthSession, Message, NewPdfRecord, PdfRecord, Role, StoredBlob, User, UserCredentials,
};
pub use ports::{
    BlobStorage, ChatCompletionService, DatabaseService, PortError, PortResult, TextStream,
};
pub use relay::{compose_prompt, ChatRequest, CompletionRequest};
pub use transcript::{ChatEntry, EntryId, StreamAccumulator, Transcript};
