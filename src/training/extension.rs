use serde_json::Value;

use super::optimizer::SharedOptimizer;
use super::trigger::{IntervalTrigger, Unit};
use super::updater::{Updater, MAIN_OPTIMIZER};
use super::TrainingError;

/// Something the trainer calls whenever its trigger fires.
pub trait Extension {
    fn name(&self) -> &str;

    fn default_trigger(&self) -> IntervalTrigger {
        IntervalTrigger::new(1, Unit::Iteration)
    }

    /// Called once before the first update of a run.
    fn initialize(&mut self, _updater: &Updater) -> Result<(), TrainingError> {
        Ok(())
    }

    fn call(&mut self, updater: &Updater) -> Result<(), TrainingError>;

    /// Serialisable state needed to resume the extension mid-run.
    fn state(&self) -> Result<Value, TrainingError> {
        Ok(Value::Null)
    }

    fn load_state(&mut self, _state: Value) -> Result<(), TrainingError> {
        Ok(())
    }
}

// The explicitly bound optimizer wins over the updater's main one.
pub(crate) fn resolve_optimizer(
    bound: Option<&SharedOptimizer>,
    updater: &Updater,
) -> Result<SharedOptimizer, TrainingError> {
    match bound {
        Some(optimizer) => Ok(optimizer.clone()),
        None => updater.get_optimizer(MAIN_OPTIMIZER),
    }
}

pub(crate) fn read_hyperparam(optimizer: &SharedOptimizer, attr: &str) -> Result<f64, TrainingError> {
    let optimizer = optimizer.borrow();
    optimizer.hyperparam(attr).ok_or_else(|| {
        TrainingError::UnknownHyperparameter(format!("{} has no '{}'", optimizer.name(), attr))
    })
}

pub(crate) fn write_hyperparam(optimizer: &SharedOptimizer, attr: &str, value: f64) -> Result<(), TrainingError> {
    optimizer.borrow_mut().set_hyperparam(attr, value)
}
