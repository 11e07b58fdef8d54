//! Training loop primitives: optimizers with named hyperparameters, an
//! updater that counts iterations, triggers, and extensions that the trainer
//! calls whenever their trigger fires.

pub mod extension;
pub mod extensions;
pub mod optimizer;
pub mod serializers;
pub mod trainer;
pub mod trigger;
pub mod updater;

pub use extension::Extension;
pub use extensions::{ExponentialShift, LinearShift};
pub use optimizer::{MomentumSGD, Optimizer, SGDOptimizer, SharedOptimizer};
pub use trainer::Trainer;
pub use trigger::{IntervalTrigger, Trigger, Unit};
pub use updater::Updater;

#[derive(Debug)]
pub enum TrainingError {
    InvalidArgument(String),
    UnknownOptimizer(String),
    UnknownHyperparameter(String),
    ShapeMismatch(String),
    Serialization(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingError::InvalidArgument(s) => write!(f, "Invalid argument: {}", s),
            TrainingError::UnknownOptimizer(s) => write!(f, "Unknown optimizer: {}", s),
            TrainingError::UnknownHyperparameter(s) => write!(f, "Unknown hyperparameter: {}", s),
            TrainingError::ShapeMismatch(s) => write!(f, "Shape mismatch: {}", s),
            TrainingError::Serialization(s) => write!(f, "Serialization error: {}", s),
            TrainingError::Io(e) => write!(f, "IO error: {}", e),
            TrainingError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for TrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainingError::Io(e) => Some(e),
            TrainingError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        TrainingError::Io(err)
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        TrainingError::Json(err)
    }
}
