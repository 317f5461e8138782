use crate::state::Batch;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Begin the harvest from an empty cursor.
    Start,
    /// A pagination request returned a decoded batch.
    BatchFetched(Batch),
    /// The request failed in transport or its body could not be decoded.
    FetchFailed { reason: String },
    /// The server answered with an `error` object.
    ApiError { code: String, info: Option<String> },
}
