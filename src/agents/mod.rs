//! Generative pipeline stages.
//!
//! Both synthesizers follow the same shape: frame one request for the
//! [`TextGenerator`](crate::llm::TextGenerator), send it, and reduce the
//! reply to a schema-checked value through [`crate::extract`].

pub mod diagnosis;
pub mod strategy;

pub use diagnosis::{AlternativeHypothesis, Confidence, Diagnosis, DiagnosisSynthesizer};
pub use strategy::{
    ClubAction, ClubActionKind, MessageTone, Reward, RewardType, Strategy, StrategySynthesizer,
};
