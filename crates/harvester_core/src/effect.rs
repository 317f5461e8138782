use std::time::Duration;

use crate::state::Continuation;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Request the next batch, forwarding `cursor` verbatim when present.
    FetchBatch { cursor: Option<Continuation> },
    /// Sleep before executing the following effect.
    Pause(Duration),
    /// The loop reached a terminal phase; see `HarvestState::into_report`.
    Finish,
}
