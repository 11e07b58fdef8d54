pub mod exponential_shift;
pub mod linear_shift;

pub use exponential_shift::ExponentialShift;
pub use linear_shift::LinearShift;
