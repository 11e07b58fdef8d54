// src/device.rs

use std::fmt;

// Represents the computational device an array lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda(usize), // usize is the device ID
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "CPU"),
            Device::Cuda(id) => write!(f, "GPU {}", id),
        }
    }
}

/// Which execution path array code takes.
///
/// `Dense` runs whole-array ndarray operations (broadcast, reductions).
/// `Elementwise` dispatches hand-written per-element kernels over the
/// worker pool, accumulating into raw output buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayModule {
    Dense,
    Elementwise,
}

impl ArrayModule {
    // Host arrays never go through custom kernels
    pub fn for_device(device: Device, elementwise: bool) -> Self {
        match device {
            Device::Cpu => ArrayModule::Dense,
            Device::Cuda(_) if elementwise => ArrayModule::Elementwise,
            Device::Cuda(_) => ArrayModule::Dense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_is_cpu() {
        assert_eq!(Device::default(), Device::Cpu);
    }

    #[test]
    fn test_cpu_always_dense() {
        assert_eq!(ArrayModule::for_device(Device::Cpu, true), ArrayModule::Dense);
        assert_eq!(ArrayModule::for_device(Device::Cpu, false), ArrayModule::Dense);
    }

    #[test]
    fn test_accelerator_respects_elementwise_flag() {
        assert_eq!(ArrayModule::for_device(Device::Cuda(0), true), ArrayModule::Elementwise);
        assert_eq!(ArrayModule::for_device(Device::Cuda(1), false), ArrayModule::Dense);
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "CPU");
        assert_eq!(Device::Cuda(2).to_string(), "GPU 2");
    }
}
