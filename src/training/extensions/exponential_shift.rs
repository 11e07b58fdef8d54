use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::training::extension::{read_hyperparam, resolve_optimizer, write_hyperparam, Extension};
use crate::training::optimizer::SharedOptimizer;
use crate::training::updater::Updater;
use crate::training::TrainingError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ExponentialShiftState {
    #[serde(default)]
    t: u64,
    #[serde(default)]
    last_value: Option<f64>,
    #[serde(default)]
    init: Option<f64>,
}

/// Multiplies an optimizer hyperparameter by `rate` every time it is called.
///
/// After `t` calls the value is `init * rate^t`. With a `target`, the value
/// sticks to the target once it crosses it: from above when decaying
/// (`rate <= 1`), from below when growing (`rate > 1`).
#[derive(Debug)]
pub struct ExponentialShift {
    attr: String,
    rate: f64,
    init: Option<f64>,
    target: Option<f64>,
    optimizer: Option<SharedOptimizer>,
    t: u64,
    last_value: Option<f64>,
}

impl ExponentialShift {
    pub fn new(attr: &str, rate: f64) -> Result<Self, TrainingError> {
        if rate < 0.0 || rate.is_nan() {
            return Err(TrainingError::InvalidArgument(format!(
                "ExponentialShift does not support negative rate (got {})",
                rate
            )));
        }
        Ok(Self {
            attr: attr.to_string(),
            rate,
            init: None,
            target: None,
            optimizer: None,
            t: 0,
            last_value: None,
        })
    }

    /// Starting value; read from the optimizer at initialization when unset.
    pub fn with_init(mut self, init: f64) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Shift this optimizer instead of the updater's main one.
    pub fn with_optimizer(mut self, optimizer: SharedOptimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    fn next_value(&self, init: f64) -> f64 {
        let value = init * self.rate.powf(self.t as f64);
        match self.target {
            Some(target) if self.past_target(value, target) => target,
            _ => value,
        }
    }

    // Same as `value / target > 1` when growing and `< 1` when decaying, for a
    // non-zero target. A zero target is never crossed: `init * rate^t` keeps
    // its sign.
    fn past_target(&self, value: f64, target: f64) -> bool {
        let growing = self.rate > 1.0;
        if target > 0.0 {
            (growing && value > target) || (!growing && value < target)
        } else if target < 0.0 {
            (growing && value < target) || (!growing && value > target)
        } else {
            false
        }
    }

    fn resolve_init(&mut self, optimizer: &SharedOptimizer) -> Result<f64, TrainingError> {
        match self.init {
            Some(init) => Ok(init),
            None => {
                let init = read_hyperparam(optimizer, &self.attr)?;
                self.init = Some(init);
                Ok(init)
            }
        }
    }

    fn apply(&mut self, optimizer: &SharedOptimizer, value: f64) -> Result<(), TrainingError> {
        write_hyperparam(optimizer, &self.attr, value)?;
        self.last_value = Some(value);
        Ok(())
    }
}

impl Extension for ExponentialShift {
    fn name(&self) -> &str {
        "ExponentialShift"
    }

    fn initialize(&mut self, updater: &Updater) -> Result<(), TrainingError> {
        let optimizer = resolve_optimizer(self.optimizer.as_ref(), updater)?;
        let init = self.resolve_init(&optimizer)?;
        // Resuming from a snapshot restores the last shifted value.
        let value = self.last_value.unwrap_or(init);
        self.apply(&optimizer, value)
    }

    fn call(&mut self, updater: &Updater) -> Result<(), TrainingError> {
        let optimizer = resolve_optimizer(self.optimizer.as_ref(), updater)?;
        let init = self.resolve_init(&optimizer)?;
        self.t += 1;
        let value = self.next_value(init);
        log::debug!("{}: {} -> {} (t = {})", self.name(), self.attr, value, self.t);
        self.apply(&optimizer, value)
    }

    fn state(&self) -> Result<Value, TrainingError> {
        let state = ExponentialShiftState {
            t: self.t,
            last_value: self.last_value,
            init: self.init,
        };
        Ok(serde_json::to_value(state)?)
    }

    fn load_state(&mut self, state: Value) -> Result<(), TrainingError> {
        if state.is_null() {
            return Ok(());
        }
        let state: ExponentialShiftState = serde_json::from_value(state)
            .map_err(|e| TrainingError::Serialization(format!("ExponentialShift state: {}", e)))?;
        self.t = state.t;
        self.last_value = state.last_value;
        if state.init.is_some() {
            self.init = state.init;
        }
        Ok(())
    }
}
