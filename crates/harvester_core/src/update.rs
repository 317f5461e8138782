use crate::policy::CycleOutcome;
use crate::state::PERMISSION_DENIED_CODE;
use crate::{Effect, HarvestState, Msg, Phase, Termination};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that arrive outside the running phase are ignored, so a finished
/// harvest can never be restarted or extended.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    if let Msg::Start = msg {
        let effects = if state.phase() == &Phase::Idle {
            state.begin();
            vec![Effect::FetchBatch {
                cursor: state.cursor().cloned(),
            }]
        } else {
            Vec::new()
        };
        return (state, effects);
    }

    if !state.is_running() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Start => Vec::new(),
        Msg::BatchFetched(batch) => {
            state.absorb(&batch);
            match batch.continuation {
                None => finish(&mut state, Termination::Exhausted),
                Some(next) => {
                    state.advance(next);
                    let pause = state.settings().backoff.pause_after(CycleOutcome::Success);
                    vec![
                        Effect::Pause(pause),
                        Effect::FetchBatch {
                            cursor: state.cursor().cloned(),
                        },
                    ]
                }
            }
        }
        Msg::FetchFailed { reason } => {
            let attempts = state.record_failure();
            if state.settings().retry.allows_retry(attempts) {
                let pause = state.settings().backoff.pause_after(CycleOutcome::Failure);
                // Same cursor: a cycle that could not be fetched is never skipped.
                vec![
                    Effect::Pause(pause),
                    Effect::FetchBatch {
                        cursor: state.cursor().cloned(),
                    },
                ]
            } else {
                finish(
                    &mut state,
                    Termination::RetriesExhausted {
                        attempts,
                        last_error: reason,
                    },
                )
            }
        }
        Msg::ApiError { code, info } => {
            let termination = if code == PERMISSION_DENIED_CODE {
                Termination::PermissionDenied { info }
            } else {
                Termination::ApiError { code, info }
            };
            finish(&mut state, termination)
        }
    };

    (state, effects)
}

fn finish(state: &mut HarvestState, termination: Termination) -> Vec<Effect> {
    state.finish(termination);
    vec![Effect::Finish]
}
