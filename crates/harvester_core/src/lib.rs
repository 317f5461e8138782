//! Harvester core: pure pagination state machine and link accumulation.
mod effect;
mod links;
mod msg;
mod policy;
mod report;
mod state;
mod update;

pub use effect::Effect;
pub use links::{is_admissible, Admission, UniqueLinkSet, ALLOWED_SCHEMES};
pub use msg::Msg;
pub use policy::{BackoffPolicy, CycleOutcome, HarvestSettings, RetryPolicy, DEFAULT_DELAY};
pub use report::{HarvestReport, HarvestView};
pub use state::{
    Batch, Continuation, HarvestState, PageLinks, Phase, Termination, PERMISSION_DENIED_CODE,
};
pub use update::update;
