//! Solver configuration and tuning constants

use serde::{Deserialize, Serialize};

/// Default fixed timestep (seconds)
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// Maximum vertex count for a convex polygon shape
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Penetration tolerance left in place by position correction. Keeps
/// resting contacts alive instead of oscillating on and off.
pub const LINEAR_SLOP: f32 = 0.005;

/// Contacts are generated while shapes are within this distance, so a
/// pair about to touch is already constrained in the same step.
pub const SPECULATIVE_DISTANCE: f32 = 0.02;

/// Fraction of remaining penetration resolved per position iteration.
/// Partial correction; tunable.
pub const POSITION_CORRECTION_FACTOR: f32 = 0.2;

/// Cap on the positional correction applied in one iteration (world units).
/// Tunable alongside [`POSITION_CORRECTION_FACTOR`].
pub const MAX_POSITION_CORRECTION: f32 = 0.2;

/// Solver variant selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Temporal Gauss-Seidel with soft position correction
    #[default]
    TgsSoft,
}

/// Per-step solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Gauss-Seidel passes over the velocity constraints
    pub velocity_iterations: usize,

    /// Soft position-correction passes
    pub position_iterations: usize,

    /// Seed contact impulses from the previous step
    pub warm_start: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 4,
            position_iterations: 2,
            warm_start: true,
        }
    }
}

impl StepConfig {
    /// Few iterations for real-time interactive use
    pub fn light() -> Self {
        Self {
            velocity_iterations: 2,
            position_iterations: 1,
            ..Default::default()
        }
    }

    /// Many iterations for higher-fidelity offline use
    pub fn heavy() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 4,
            ..Default::default()
        }
    }

    /// Set iteration counts
    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Enable or disable warm starting
    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.warm_start = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StepConfig::default();
        assert_eq!(config.velocity_iterations, 4);
        assert_eq!(config.position_iterations, 2);
        assert!(config.warm_start);
    }

    #[test]
    fn test_presets() {
        assert!(StepConfig::light().velocity_iterations < StepConfig::heavy().velocity_iterations);
        assert!(StepConfig::light().position_iterations < StepConfig::heavy().position_iterations);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = StepConfig::heavy().with_warm_start(false);
        let json = serde_json::to_string(&config).unwrap();
        let back: StepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
