//! Loyalty intelligence pipeline.
//!
//! Turns a retail customer's purchase history and feedback into a loyalty
//! intervention in three stages:
//!
//! 1. [`signals`]: deterministic behavioral signals (category churn, spend
//!    velocity, premium/value quality shift).
//! 2. [`agents::diagnosis`]: one text-generator call inferring the most
//!    likely lifestyle shift, reduced to a validated [`agents::Diagnosis`].
//! 3. [`agents::strategy`]: one text-generator call designing the
//!    intervention and a loyalty-platform request payload.
//!
//! [`pipeline::LoyaltyPipeline`] sequences the stages; the text generator is
//! injected, so tests and alternative backends plug in through
//! [`llm::TextGenerator`].

pub mod agents;
pub mod config;
pub mod customer;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod signals;

pub use config::Config;
pub use customer::CustomerRecord;
pub use error::{Error, PipelineError, Result};
pub use pipeline::{LoyaltyPipeline, PipelineReport, Stage, StageEvent, StageObserver};
