use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::TrainingError;

/// An optimizer shared between the updater and the extensions that tune it.
pub type SharedOptimizer = Rc<RefCell<dyn Optimizer>>;

pub fn shared<O: Optimizer + 'static>(optimizer: O) -> SharedOptimizer {
    Rc::new(RefCell::new(optimizer))
}

/// Parameter update rule whose hyperparameters are addressable by name.
pub trait Optimizer: Debug {
    fn name(&self) -> &str;

    fn hyperparam(&self, name: &str) -> Option<f64>;

    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), TrainingError>;

    /// Applies one update step to `params` in place.
    fn update(&mut self, params: &mut [f32], grads: &[f32]) -> Result<(), TrainingError>;
}

fn check_lengths(params: &[f32], grads: &[f32]) -> Result<(), TrainingError> {
    if params.len() != grads.len() {
        return Err(TrainingError::ShapeMismatch(format!(
            "{} parameters but {} gradients",
            params.len(),
            grads.len()
        )));
    }
    Ok(())
}

/// Simple stochastic gradient descent optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct SGDOptimizer {
    pub lr: f64,
}

impl SGDOptimizer {
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }
}

impl Default for SGDOptimizer {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Optimizer for SGDOptimizer {
    fn name(&self) -> &str {
        "SGD"
    }

    fn hyperparam(&self, name: &str) -> Option<f64> {
        match name {
            "lr" => Some(self.lr),
            _ => None,
        }
    }

    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), TrainingError> {
        match name {
            "lr" => {
                self.lr = value;
                Ok(())
            }
            other => Err(TrainingError::UnknownHyperparameter(format!("{} has no '{}'", self.name(), other))),
        }
    }

    fn update(&mut self, params: &mut [f32], grads: &[f32]) -> Result<(), TrainingError> {
        check_lengths(params, grads)?;
        let lr = self.lr as f32;
        for (p, g) in params.iter_mut().zip(grads.iter()) {
            *p -= lr * g;
        }
        Ok(())
    }
}

/// SGD with classical momentum: `v = momentum * v - lr * g; p += v`.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumSGD {
    pub lr: f64,
    pub momentum: f64,
    velocity: Vec<f32>,
}

impl MomentumSGD {
    pub fn new(lr: f64, momentum: f64) -> Self {
        Self {
            lr,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Default for MomentumSGD {
    fn default() -> Self {
        Self::new(0.01, 0.9)
    }
}

impl Optimizer for MomentumSGD {
    fn name(&self) -> &str {
        "MomentumSGD"
    }

    fn hyperparam(&self, name: &str) -> Option<f64> {
        match name {
            "lr" => Some(self.lr),
            "momentum" => Some(self.momentum),
            _ => None,
        }
    }

    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), TrainingError> {
        match name {
            "lr" => self.lr = value,
            "momentum" => self.momentum = value,
            other => {
                return Err(TrainingError::UnknownHyperparameter(format!(
                    "{} has no '{}'",
                    self.name(),
                    other
                )))
            }
        }
        Ok(())
    }

    fn update(&mut self, params: &mut [f32], grads: &[f32]) -> Result<(), TrainingError> {
        check_lengths(params, grads)?;
        if self.velocity.len() != params.len() {
            self.velocity = vec![0.0; params.len()];
        }
        let (lr, momentum) = (self.lr as f32, self.momentum as f32);
        for ((p, g), v) in params.iter_mut().zip(grads.iter()).zip(self.velocity.iter_mut()) {
            *v = momentum * *v - lr * g;
            *p += *v;
        }
        Ok(())
    }
}
