//! Kernel configuration

/// Default quantum between passes (µs)
pub const DEFAULT_QUANTUM_US: u32 = 500;

/// Runtime kernel settings, fixed at construction
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Time let pass between dispatch passes, in microseconds.
    /// A scheduling quantum, not a precise timer.
    pub quantum_us: u32,
}

impl KernelConfig {
    pub fn with_quantum_us(self, quantum_us: u32) -> Self {
        Self { quantum_us, ..self }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            quantum_us: DEFAULT_QUANTUM_US,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quantum() {
        assert_eq!(KernelConfig::default().quantum_us, DEFAULT_QUANTUM_US);
    }

    #[test]
    fn test_builder() {
        let config = KernelConfig::default().with_quantum_us(1000);
        assert_eq!(config.quantum_us, 1000);
    }
}
