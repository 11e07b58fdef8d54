use std::collections::BTreeMap;
use std::fmt;

use super::optimizer::SharedOptimizer;
use super::TrainingError;

pub const MAIN_OPTIMIZER: &str = "main";

/// One training step. Receives the updater's optimizers and the iteration
/// about to be completed (1-based).
pub type UpdateStep = Box<dyn FnMut(u64, &BTreeMap<String, SharedOptimizer>) -> Result<(), TrainingError>>;

/// Owns the optimizers and the iteration counter of a training run.
pub struct Updater {
    iteration: u64,
    iterations_per_epoch: u64,
    optimizers: BTreeMap<String, SharedOptimizer>,
    step: Option<UpdateStep>,
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("iteration", &self.iteration)
            .field("iterations_per_epoch", &self.iterations_per_epoch)
            .field("optimizers", &self.optimizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Updater {
    pub fn new(main: SharedOptimizer) -> Self {
        let mut optimizers = BTreeMap::new();
        optimizers.insert(MAIN_OPTIMIZER.to_string(), main);
        Self {
            iteration: 0,
            iterations_per_epoch: 1,
            optimizers,
            step: None,
        }
    }

    pub fn with_optimizer(mut self, name: &str, optimizer: SharedOptimizer) -> Self {
        self.optimizers.insert(name.to_string(), optimizer);
        self
    }

    pub fn with_step<F>(mut self, step: F) -> Self
    where
        F: FnMut(u64, &BTreeMap<String, SharedOptimizer>) -> Result<(), TrainingError> + 'static,
    {
        self.step = Some(Box::new(step));
        self
    }

    /// Number of iterations that make up one epoch (at least 1).
    pub fn with_iterations_per_epoch(mut self, iterations: u64) -> Self {
        self.iterations_per_epoch = iterations.max(1);
        self
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }

    pub fn epoch(&self) -> u64 {
        self.iteration / self.iterations_per_epoch
    }

    pub fn epoch_detail(&self) -> f64 {
        self.iteration as f64 / self.iterations_per_epoch as f64
    }

    pub fn iterations_per_epoch(&self) -> u64 {
        self.iterations_per_epoch
    }

    pub fn get_optimizer(&self, name: &str) -> Result<SharedOptimizer, TrainingError> {
        self.optimizers
            .get(name)
            .cloned()
            .ok_or_else(|| TrainingError::UnknownOptimizer(name.to_string()))
    }

    /// Runs the step (if any) and advances the iteration counter.
    pub fn update(&mut self) -> Result<(), TrainingError> {
        if let Some(step) = self.step.as_mut() {
            step(self.iteration + 1, &self.optimizers)?;
        }
        self.iteration += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::optimizer::{shared, SGDOptimizer};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_update_advances_iteration_and_epoch() {
        let mut updater = Updater::new(shared(SGDOptimizer::default())).with_iterations_per_epoch(4);
        for _ in 0..6 {
            updater.update().unwrap();
        }
        assert_eq!(updater.iteration(), 6);
        assert_eq!(updater.epoch(), 1);
        assert_eq!(updater.epoch_detail(), 1.5);
    }

    #[test]
    fn test_step_receives_iteration_and_optimizers() {
        let seen = Rc::new(Cell::new(0u64));
        let seen_in_step = Rc::clone(&seen);
        let mut updater = Updater::new(shared(SGDOptimizer::new(0.5))).with_step(move |iteration, optimizers| {
            assert!(optimizers.contains_key(MAIN_OPTIMIZER));
            seen_in_step.set(iteration);
            Ok(())
        });
        updater.update().unwrap();
        updater.update().unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_failed_step_does_not_advance() {
        let mut updater = Updater::new(shared(SGDOptimizer::default()))
            .with_step(|_, _| Err(TrainingError::InvalidArgument("boom".to_string())));
        assert!(updater.update().is_err());
        assert_eq!(updater.iteration(), 0);
    }

    #[test]
    fn test_get_optimizer_by_name() {
        let updater = Updater::new(shared(SGDOptimizer::new(0.1)))
            .with_optimizer("critic", shared(SGDOptimizer::new(0.2)));
        assert_eq!(updater.get_optimizer("critic").unwrap().borrow().hyperparam("lr"), Some(0.2));
        assert!(matches!(
            updater.get_optimizer("missing"),
            Err(TrainingError::UnknownOptimizer(_))
        ));
    }

    #[test]
    fn test_zero_iterations_per_epoch_is_clamped() {
        let updater = Updater::new(shared(SGDOptimizer::default())).with_iterations_per_epoch(0);
        assert_eq!(updater.iterations_per_epoch(), 1);
    }
}
