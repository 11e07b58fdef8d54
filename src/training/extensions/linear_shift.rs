use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::training::extension::{resolve_optimizer, write_hyperparam, Extension};
use crate::training::optimizer::SharedOptimizer;
use crate::training::updater::Updater;
use crate::training::TrainingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearShiftState {
    #[serde(default)]
    t: u64,
    #[serde(default)]
    last_value: Option<f64>,
}

/// Moves a hyperparameter linearly from `v1` to `v2` between calls `t1` and
/// `t2`; holds `v1` before and `v2` after.
#[derive(Debug)]
pub struct LinearShift {
    attr: String,
    value_range: (f64, f64),
    time_range: (u64, u64),
    optimizer: Option<SharedOptimizer>,
    t: u64,
    last_value: Option<f64>,
}

impl LinearShift {
    pub fn new(attr: &str, value_range: (f64, f64), time_range: (u64, u64)) -> Self {
        Self {
            attr: attr.to_string(),
            value_range,
            time_range,
            optimizer: None,
            t: 0,
            last_value: None,
        }
    }

    pub fn with_optimizer(mut self, optimizer: SharedOptimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    fn compute_value(&self) -> f64 {
        let (t1, t2) = self.time_range;
        let (v1, v2) = self.value_range;
        if self.t <= t1 {
            v1
        } else if self.t >= t2 {
            v2
        } else {
            let rate = (self.t - t1) as f64 / (t2 - t1) as f64;
            v1 + rate * (v2 - v1)
        }
    }

    fn apply(&mut self, optimizer: &SharedOptimizer, value: f64) -> Result<(), TrainingError> {
        write_hyperparam(optimizer, &self.attr, value)?;
        self.last_value = Some(value);
        Ok(())
    }
}

impl Extension for LinearShift {
    fn name(&self) -> &str {
        "LinearShift"
    }

    fn initialize(&mut self, updater: &Updater) -> Result<(), TrainingError> {
        let optimizer = resolve_optimizer(self.optimizer.as_ref(), updater)?;
        let value = match self.last_value {
            Some(value) => value,
            None => self.compute_value(),
        };
        self.apply(&optimizer, value)
    }

    fn call(&mut self, updater: &Updater) -> Result<(), TrainingError> {
        let optimizer = resolve_optimizer(self.optimizer.as_ref(), updater)?;
        self.t += 1;
        let value = self.compute_value();
        self.apply(&optimizer, value)
    }

    fn state(&self) -> Result<Value, TrainingError> {
        Ok(serde_json::to_value(LinearShiftState {
            t: self.t,
            last_value: self.last_value,
        })?)
    }

    fn load_state(&mut self, state: Value) -> Result<(), TrainingError> {
        if state.is_null() {
            return Ok(());
        }
        let state: LinearShiftState = serde_json::from_value(state)
            .map_err(|e| TrainingError::Serialization(format!("LinearShift state: {}", e)))?;
        self.t = state.t;
        self.last_value = state.last_value;
        Ok(())
    }
}
