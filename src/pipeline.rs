//! Pipeline orchestrator.
//!
//! ```text
//! CustomerRecord
//!     ↓
//! [Signals]    deterministic, no generator call
//!     ↓ BehaviorSignals
//! [Diagnosis]  one generator call ← feedback
//!     ↓ Diagnosis
//! [Strategy]   one generator call ← customer_id
//!     ↓ Strategy
//! PipelineReport
//! ```
//!
//! Stages run strictly in sequence and each consumes the previous stage's
//! value. Any failure ends the run: there is no partial report and no retry.
//! The orchestrator holds nothing but the shared generator, so concurrent
//! runs over different customers are independent.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{Diagnosis, DiagnosisSynthesizer, Strategy, StrategySynthesizer};
use crate::customer::CustomerRecord;
use crate::error::PipelineError;
use crate::llm::TextGenerator;
use crate::signals::{self, BehaviorSignals};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Signals,
    Diagnosis,
    Strategy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signals => write!(f, "signals"),
            Self::Diagnosis => write!(f, "diagnosis"),
            Self::Strategy => write!(f, "strategy"),
        }
    }
}

/// Progress notification emitted around each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Started(Stage),
    Completed(Stage),
}

/// Receives [`StageEvent`]s while a run is in progress.
pub trait StageObserver: Send + Sync {
    fn on_event(&self, event: StageEvent);
}

impl<F> StageObserver for F
where
    F: Fn(StageEvent) + Send + Sync,
{
    fn on_event(&self, event: StageEvent) {
        self(event)
    }
}

/// Aggregate result of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub behavior_signals: BehaviorSignals,
    pub diagnosis: Diagnosis,
    pub loyalty_strategy: Strategy,
}

/// Runs signals → diagnosis → strategy for one customer at a time.
pub struct LoyaltyPipeline {
    diagnosis: DiagnosisSynthesizer,
    strategy: StrategySynthesizer,
    observer: Option<Arc<dyn StageObserver>>,
}

impl LoyaltyPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            diagnosis: DiagnosisSynthesizer::new(Arc::clone(&generator)),
            strategy: StrategySynthesizer::new(generator),
            observer: None,
        }
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run the full pipeline for a customer record.
    pub async fn run(&self, customer: &CustomerRecord) -> Result<PipelineReport, PipelineError> {
        self.run_with_cancel(customer, &CancellationToken::new())
            .await
    }

    /// Validate a raw JSON customer record, then run the pipeline.
    ///
    /// A record missing a required top-level field fails with `InvalidInput`
    /// before any stage runs.
    pub async fn run_value(
        &self,
        value: serde_json::Value,
    ) -> Result<PipelineReport, PipelineError> {
        let customer = CustomerRecord::from_value(value)?;
        self.run(&customer).await
    }

    /// Run the pipeline, abandoning it as soon as `cancel` fires during a
    /// generative stage.
    pub async fn run_with_cancel(
        &self,
        customer: &CustomerRecord,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let span = tracing::info_span!(
            "pipeline",
            run_id = %Uuid::new_v4(),
            customer_id = %customer.customer_id
        );

        async {
            tracing::info!("Pipeline started");

            self.notify(StageEvent::Started(Stage::Signals));
            let behavior_signals = signals::analyze(&customer.purchase_history);
            self.notify(StageEvent::Completed(Stage::Signals));

            self.notify(StageEvent::Started(Stage::Diagnosis));
            let diagnosis = Self::until_cancelled(
                cancel,
                Stage::Diagnosis,
                self.diagnosis.infer(&behavior_signals, &customer.feedback),
            )
            .await?;
            self.notify(StageEvent::Completed(Stage::Diagnosis));

            self.notify(StageEvent::Started(Stage::Strategy));
            let loyalty_strategy = Self::until_cancelled(
                cancel,
                Stage::Strategy,
                self.strategy.design(&diagnosis, &customer.customer_id),
            )
            .await?;
            self.notify(StageEvent::Completed(Stage::Strategy));

            tracing::info!("Pipeline completed");
            Ok(PipelineReport {
                behavior_signals,
                diagnosis,
                loyalty_strategy,
            })
        }
        .instrument(span)
        .await
        .inspect_err(|e| tracing::error!("Pipeline failed: {}", e))
    }

    /// Drive one generative stage unless `cancel` fires first. A token that
    /// is already cancelled stops the run before the stage starts its call.
    async fn until_cancelled<T>(
        cancel: &CancellationToken,
        stage: Stage,
        work: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Pipeline cancelled at {} stage", stage);
                Err(PipelineError::Cancelled { stage })
            }
            result = work => result,
        }
    }

    fn notify(&self, event: StageEvent) {
        tracing::debug!("{:?}", event);
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}
