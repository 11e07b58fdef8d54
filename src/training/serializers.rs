use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::extension::Extension;
use super::trainer::{Trainer, TrainerState};
use super::TrainingError;

/// Writes the state of `extension` to `path` as JSON.
pub fn save_json<P: AsRef<Path>>(path: P, extension: &dyn Extension) -> Result<(), TrainingError> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), &extension.state()?)?;
    log::debug!("saved '{}' to {}", extension.name(), path.as_ref().display());
    Ok(())
}

/// Restores `extension` from a file written by [`save_json`].
pub fn load_json<P: AsRef<Path>>(path: P, extension: &mut dyn Extension) -> Result<(), TrainingError> {
    let file = File::open(path.as_ref())?;
    let state = serde_json::from_reader(BufReader::new(file))?;
    extension.load_state(state)?;
    log::debug!("loaded '{}' from {}", extension.name(), path.as_ref().display());
    Ok(())
}

pub fn save_trainer<P: AsRef<Path>>(path: P, trainer: &Trainer) -> Result<(), TrainingError> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), &trainer.state()?)?;
    Ok(())
}

pub fn load_trainer<P: AsRef<Path>>(path: P, trainer: &mut Trainer) -> Result<(), TrainingError> {
    let file = File::open(path.as_ref())?;
    let state: TrainerState = serde_json::from_reader(BufReader::new(file))?;
    trainer.load_state(state)
}
