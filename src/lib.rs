// Array utilities with a dense and an elementwise-kernel execution path,
// training-loop extensions, and wheel packaging metadata.

pub mod common;
pub mod config;
pub mod device;
pub mod elementwise;
pub mod kmeans;
pub mod training;
pub mod wheel_metadata;

pub use device::{ArrayModule, Device};
pub use kmeans::{KMeans, KMeansError, KMeansResult};
