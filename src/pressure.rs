use std::sync::atomic::{AtomicU8, Ordering};

/// Coarse headroom signal owned by the allocator subsystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Relaxed,
    Elevated,
    Critical,
}

impl PressureLevel {
    /// The projection the scheduler acts on: anything short of relaxed
    /// means free device memory is scarce.
    pub fn low_headroom(self) -> bool {
        self != PressureLevel::Relaxed
    }
}

/// Read-only view of allocator pressure. The scheduler queries it fresh on
/// every adaptive resolution and never caches the answer.
pub trait PressureMonitor: Send + Sync {
    fn pressure_level(&self) -> PressureLevel;
}

/// Shared gauge the allocator side updates and the scheduler reads.
pub struct PressureGauge {
    level: AtomicU8,
}

impl PressureGauge {
    pub fn new() -> Self {
        Self {
            level: AtomicU8::new(PressureLevel::Relaxed as u8),
        }
    }

    pub fn set_level(&self, level: PressureLevel) {
        self.level.store(level as u8, Ordering::Release);
    }
}

impl Default for PressureGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureMonitor for PressureGauge {
    fn pressure_level(&self) -> PressureLevel {
        match self.level.load(Ordering::Acquire) {
            0 => PressureLevel::Relaxed,
            1 => PressureLevel::Elevated,
            _ => PressureLevel::Critical,
        }
    }
}
