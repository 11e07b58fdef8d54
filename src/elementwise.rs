// src/elementwise.rs

use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A raw output buffer that kernels scatter into.
///
/// Every slot is an `f64` stored as bits in an `AtomicU64` so that any number
/// of workers can `atomic_add` into the same slot.
#[derive(Debug)]
pub struct RawBuffer {
    cells: Vec<AtomicU64>,
}

impl RawBuffer {
    pub fn zeros(len: usize) -> Self {
        let cells = (0..len).map(|_| AtomicU64::new(0f64.to_bits())).collect();
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn atomic_add(&self, index: usize, value: f64) {
        let cell = &self.cells[index];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn get(&self, index: usize) -> f64 {
        f64::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.cells
            .into_iter()
            .map(|c| f64::from_bits(c.into_inner()))
            .collect()
    }
}

/// A named per-element kernel.
///
/// The body runs once for every flat index `i` in `0..n`, in parallel, and
/// may add into any slot of the raw output buffers it is launched with.
pub struct ElementwiseKernel<F>
where
    F: Fn(usize, &[RawBuffer]) + Sync,
{
    name: &'static str,
    body: F,
}

impl<F> ElementwiseKernel<F>
where
    F: Fn(usize, &[RawBuffer]) + Sync,
{
    pub fn new(name: &'static str, body: F) -> Self {
        Self { name, body }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn launch(&self, n: usize, outputs: &[RawBuffer]) {
        let start = Instant::now();
        (0..n).into_par_iter().for_each(|i| (self.body)(i, outputs));
        log::debug!(
            "kernel '{}' over {} elements took {:?}",
            self.name,
            n,
            start.elapsed()
        );
    }
}
