use super::updater::Updater;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Iteration,
    Epoch,
}

/// Decides, after each update, whether an extension should run.
pub trait Trigger {
    fn fire(&mut self, updater: &Updater) -> bool;
}

/// Fires every `period` iterations or epochs.
///
/// Firing is decided by the counter crossing a multiple of `period` since the
/// last check, so a trigger attached to a resumed run stays in phase.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTrigger {
    period: u64,
    unit: Unit,
    previous: Option<u64>,
}

impl IntervalTrigger {
    pub fn new(period: u64, unit: Unit) -> Self {
        Self {
            period: period.max(1),
            unit,
            previous: None,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    fn counter(&self, updater: &Updater) -> u64 {
        match self.unit {
            Unit::Iteration => updater.iteration(),
            Unit::Epoch => updater.epoch(),
        }
    }
}

impl From<(u64, Unit)> for IntervalTrigger {
    fn from((period, unit): (u64, Unit)) -> Self {
        IntervalTrigger::new(period, unit)
    }
}

impl Trigger for IntervalTrigger {
    fn fire(&mut self, updater: &Updater) -> bool {
        let current = self.counter(updater);
        let previous = match self.previous {
            Some(previous) => previous,
            None => match self.unit {
                Unit::Iteration => current.saturating_sub(1),
                Unit::Epoch => updater.iteration().saturating_sub(1) / updater.iterations_per_epoch(),
            },
        };
        self.previous = Some(current);
        previous / self.period != current / self.period
    }
}
