use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{
    update, Continuation, Effect, HarvestReport, HarvestSettings, HarvestState, Msg,
    PERMISSION_DENIED_CODE,
};

use crate::auth::Session;
use crate::decode::{decode_batch, BatchReply};
use crate::{FailureKind, FetchError, HarvestEvent};

/// Pages requested per pagination cycle.
pub const PAGES_PER_BATCH: &str = "50";

/// Source of pagination batches. Implemented by [`Session`]; tests supply
/// scripted sources.
#[async_trait::async_trait]
pub trait BatchSource: Send + Sync {
    async fn fetch_batch(&self, cursor: Option<&Continuation>) -> Result<BatchReply, FetchError>;
}

/// Performs the pauses the harvest loop asks for.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait::async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::BatchCompleted {
                batch,
                unique_links,
                ..
            } => {
                engine_info!("batch {}: {} unique external urls found", batch, unique_links);
            }
            HarvestEvent::CycleFailed {
                batch,
                attempt,
                error,
                retry_in,
            } => match retry_in {
                Some(pause) => engine_warn!(
                    "error in batch {} (attempt {}): {}; retrying in {:?}",
                    batch,
                    attempt,
                    error,
                    pause
                ),
                None => engine_error!(
                    "error in batch {} (attempt {}): {}; giving up",
                    batch,
                    attempt,
                    error
                ),
            },
            HarvestEvent::ApiError { code, info } => {
                engine_error!("api error: {} {}", code, info.unwrap_or_default());
                if code == PERMISSION_DENIED_CODE {
                    engine_error!("read access denied - check your bot permissions");
                }
            }
            HarvestEvent::Finished { unique_links, .. } => {
                engine_info!("extraction complete: {} total external links", unique_links);
            }
        }
    }
}

#[async_trait::async_trait]
impl BatchSource for Session {
    async fn fetch_batch(&self, cursor: Option<&Continuation>) -> Result<BatchReply, FetchError> {
        let mut params: Vec<(String, String)> = [
            ("action", "query"),
            ("generator", "allpages"),
            ("prop", "extlinks"),
            ("ellimit", "max"),
            ("gaplimit", PAGES_PER_BATCH),
            ("format", "json"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        if let Some(cursor) = cursor {
            // Continuation keys replace base parameters of the same name.
            for (key, value) in cursor.to_params() {
                params.retain(|(existing, _)| existing != &key);
                params.push((key, value));
            }
        }

        let body = self.client().get(&params).await?;
        decode_batch(&body).map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

/// Drives the pagination state machine against a [`BatchSource`].
pub struct Harvester {
    settings: HarvestSettings,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn ProgressSink>,
}

impl Harvester {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            pacer: Arc::new(TokioPacer),
            sink: Arc::new(LogProgressSink),
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs until the corpus is exhausted, an API error stops the loop, or the
    /// retry policy gives up. Never fails: early stops still return the links
    /// gathered so far.
    pub async fn run(&self, source: &dyn BatchSource) -> HarvestReport {
        engine_info!("starting external link extraction...");
        let (mut state, effects) = update(HarvestState::new(self.settings), Msg::Start);
        let mut pending: VecDeque<Effect> = effects.into();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Pause(duration) => {
                    engine_debug!("pausing {:?}", duration);
                    self.pacer.pause(duration).await;
                }
                Effect::FetchBatch { cursor } => {
                    let msg = self.fetch(source, cursor.as_ref()).await;
                    let links_before = state.links().len();
                    let failure = match &msg {
                        Msg::FetchFailed { reason } => Some(reason.clone()),
                        _ => None,
                    };
                    let fetched = matches!(msg, Msg::BatchFetched(_));

                    let (next, effects) = update(state, msg);
                    state = next;

                    let view = state.view();
                    if fetched {
                        self.sink.emit(HarvestEvent::BatchCompleted {
                            batch: view.cycles,
                            new_links: view.unique_links - links_before,
                            unique_links: view.unique_links,
                        });
                    } else if let Some(error) = failure {
                        self.sink.emit(HarvestEvent::CycleFailed {
                            batch: view.cycles + 1,
                            attempt: state.consecutive_failures(),
                            error,
                            retry_in: first_pause(&effects),
                        });
                    }
                    pending.extend(effects);
                }
                Effect::Finish => break,
            }
        }

        let report = state.into_report();
        self.sink.emit(HarvestEvent::Finished {
            termination: report.termination.clone(),
            unique_links: report.links.len(),
        });
        report
    }

    async fn fetch(&self, source: &dyn BatchSource, cursor: Option<&Continuation>) -> Msg {
        match source.fetch_batch(cursor).await {
            Ok(BatchReply::Batch(batch)) => Msg::BatchFetched(batch),
            Ok(BatchReply::ApiError(error)) => {
                self.sink.emit(HarvestEvent::ApiError {
                    code: error.code.clone(),
                    info: error.info.clone(),
                });
                Msg::ApiError {
                    code: error.code,
                    info: error.info,
                }
            }
            Err(err) => Msg::FetchFailed {
                reason: err.to_string(),
            },
        }
    }
}

fn first_pause(effects: &[Effect]) -> Option<Duration> {
    effects.iter().find_map(|effect| match effect {
        Effect::Pause(duration) => Some(*duration),
        _ => None,
    })
}
