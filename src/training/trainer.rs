use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::extension::Extension;
use super::trigger::{IntervalTrigger, Trigger};
use super::updater::Updater;
use super::TrainingError;

struct ExtensionEntry {
    name: String,
    extension: Box<dyn Extension>,
    trigger: Box<dyn Trigger>,
}

/// Resumable state of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub iteration: u64,
    pub extensions: BTreeMap<String, Value>,
}

/// Drives the updater until the stop trigger fires, checking it before each
/// update and calling extensions on their triggers after it.
pub struct Trainer {
    pub updater: Updater,
    stop_trigger: IntervalTrigger,
    extensions: Vec<ExtensionEntry>,
}

impl Trainer {
    pub fn new(updater: Updater, stop_trigger: impl Into<IntervalTrigger>) -> Self {
        Self {
            updater,
            stop_trigger: stop_trigger.into(),
            extensions: Vec::new(),
        }
    }

    /// Registers an extension under its default trigger and returns the name
    /// it is registered as.
    pub fn extend(&mut self, extension: Box<dyn Extension>) -> String {
        let trigger = extension.default_trigger();
        self.extend_with_trigger(extension, trigger)
    }

    /// Registers an extension under `trigger`. A name already taken by another
    /// extension gets an ordinal suffix (`ExponentialShift_1`, ...), which is
    /// also the key of its entry in [`TrainerState`].
    pub fn extend_with_trigger<T: Trigger + 'static>(&mut self, extension: Box<dyn Extension>, trigger: T) -> String {
        let name = self.unique_name(extension.name());
        log::debug!("registered extension '{}'", name);
        self.extensions.push(ExtensionEntry {
            name: name.clone(),
            extension,
            trigger: Box::new(trigger),
        });
        name
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.extensions.iter().any(|entry| entry.name == name);
        if !taken(base) {
            return base.to_string();
        }
        let mut ordinal = 1;
        loop {
            let name = format!("{}_{}", base, ordinal);
            if !taken(&name) {
                return name;
            }
            ordinal += 1;
        }
    }

    pub fn get_extension(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.extension.as_ref())
    }

    pub fn run(&mut self) -> Result<(), TrainingError> {
        for entry in self.extensions.iter_mut() {
            entry.extension.initialize(&self.updater)?;
        }

        // A restored run that already reached the stop condition does no work.
        while !self.stop_trigger.fire(&self.updater) {
            self.updater.update()?;
            for entry in self.extensions.iter_mut() {
                if entry.trigger.fire(&self.updater) {
                    log::trace!(
                        "iteration {}: calling '{}'",
                        self.updater.iteration(),
                        entry.name
                    );
                    entry.extension.call(&self.updater)?;
                }
            }
        }
        log::info!("training stopped at iteration {}", self.updater.iteration());
        Ok(())
    }

    pub fn state(&self) -> Result<TrainerState, TrainingError> {
        let mut extensions = BTreeMap::new();
        for entry in &self.extensions {
            extensions.insert(entry.name.clone(), entry.extension.state()?);
        }
        Ok(TrainerState {
            iteration: self.updater.iteration(),
            extensions,
        })
    }

    /// Restores the iteration counter and the state of every registered
    /// extension found in `state`. Extensions missing from it are left as is.
    pub fn load_state(&mut self, state: TrainerState) -> Result<(), TrainingError> {
        self.updater.set_iteration(state.iteration);
        let mut saved = state.extensions;
        for entry in self.extensions.iter_mut() {
            if let Some(value) = saved.remove(&entry.name) {
                entry.extension.load_state(value)?;
            }
        }
        Ok(())
    }
}
