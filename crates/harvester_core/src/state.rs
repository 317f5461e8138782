use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::links::UniqueLinkSet;
use crate::policy::HarvestSettings;
use crate::report::{HarvestReport, HarvestView};

/// API error code the server returns when the account lacks read rights.
pub const PERMISSION_DENIED_CODE: &str = "readapidenied";

/// Opaque continuation block issued by the server with each batch.
///
/// Its keys and values are echoed back verbatim on the next request and are
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Continuation(Map<String, Value>);

impl Continuation {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Renders every field as a request parameter. Strings are passed as-is,
    /// other scalars use their JSON text.
    pub fn to_params(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

impl From<Map<String, Value>> for Continuation {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLinks {
    pub page_id: String,
    pub title: Option<String>,
    pub links: Vec<String>,
}

/// One decoded pagination response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    pub pages: Vec<PageLinks>,
    pub continuation: Option<Continuation>,
}

/// Why the harvest loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The server returned a batch without a continuation block.
    Exhausted,
    /// The account may not read through the API.
    PermissionDenied { info: Option<String> },
    /// Any other API-level error; the loop stops without retrying.
    ApiError { code: String, info: Option<String> },
    /// A cycle kept failing until the retry policy gave up.
    RetriesExhausted { attempts: u32, last_error: String },
}

impl Termination {
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Exhausted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Finished(Termination),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HarvestState {
    settings: HarvestSettings,
    phase: Phase,
    cursor: Option<Continuation>,
    links: UniqueLinkSet,
    cycles: u64,
    failed_cycles: u64,
    consecutive_failures: u32,
}

impl HarvestState {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn cursor(&self) -> Option<&Continuation> {
        self.cursor.as_ref()
    }

    pub fn links(&self) -> &UniqueLinkSet {
        &self.links
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn view(&self) -> HarvestView {
        HarvestView {
            phase: self.phase.clone(),
            cycles: self.cycles,
            failed_cycles: self.failed_cycles,
            unique_links: self.links.len(),
            has_cursor: self.cursor.is_some(),
        }
    }

    /// Consumes the state into a report. `termination` is `None` when the
    /// loop was abandoned before reaching a terminal phase.
    pub fn into_report(self) -> HarvestReport {
        let termination = match self.phase {
            Phase::Finished(termination) => Some(termination),
            Phase::Idle | Phase::Running => None,
        };
        HarvestReport {
            links: self.links,
            cycles: self.cycles,
            failed_cycles: self.failed_cycles,
            termination,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub(crate) fn begin(&mut self) {
        self.phase = Phase::Running;
    }

    pub(crate) fn finish(&mut self, termination: Termination) {
        self.phase = Phase::Finished(termination);
    }

    /// Folds a batch into the link set; rejected and duplicate links are dropped.
    pub(crate) fn absorb(&mut self, batch: &Batch) {
        self.cycles += 1;
        self.consecutive_failures = 0;
        for url in batch.pages.iter().flat_map(|page| page.links.iter()) {
            self.links.admit(url);
        }
    }

    pub(crate) fn advance(&mut self, cursor: Continuation) {
        self.cursor = Some(cursor);
    }

    pub(crate) fn record_failure(&mut self) -> u32 {
        self.failed_cycles += 1;
        self.consecutive_failures += 1;
        self.consecutive_failures
    }
}
