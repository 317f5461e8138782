//! Harvester engine: API client, authentication, harvest driver and result persistence.
mod auth;
mod client;
mod decode;
mod filename;
mod harvester;
mod persist;
mod types;

pub use auth::{authenticate, AuthError, AuthStage, Credentials, Session, LOGIN_SUCCESS};
pub use client::{ApiClient, ClientSettings, DEFAULT_USER_AGENT};
pub use decode::{
    decode_batch, decode_login, decode_token, ApiErrorBody, BatchReply, DecodeError, LoginReply,
    TokenReply,
};
pub use filename::{dated_filename, LINKS_FILE_PREFIX};
pub use harvester::{
    BatchSource, Harvester, LogProgressSink, Pacer, ProgressSink, TokioPacer, PAGES_PER_BATCH,
};
pub use persist::{render_link_list, write_link_list, LinkFileWriter, PersistError};
pub use types::{FailureKind, FetchError, HarvestEvent};
