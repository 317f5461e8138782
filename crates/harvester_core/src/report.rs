use crate::links::UniqueLinkSet;
use crate::state::{Phase, Termination};

/// Snapshot of loop progress, cheap to produce after every message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestView {
    pub phase: Phase,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub unique_links: usize,
    pub has_cursor: bool,
}

/// Final outcome of a harvest run.
///
/// `links` holds whatever was accumulated, including when `termination`
/// reports an early stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub links: UniqueLinkSet,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub termination: Option<Termination>,
}

impl HarvestReport {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// True only when the server signalled the end of the corpus.
    pub fn is_complete(&self) -> bool {
        self.termination
            .as_ref()
            .is_some_and(Termination::is_complete)
    }
}
