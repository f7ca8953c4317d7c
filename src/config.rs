//! Configuration management for the RSU group analyzer

/// Default configuration for the dynamic grouping engine
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    /// Initial neighborhood radius for the density clustering pass
    pub eps: f64,

    /// Minimum neighbors (including self) for a core point
    pub min_samples: usize,

    /// Stability score below which the radius is tightened
    pub stability_threshold: f64,

    /// Multiplicative radius decay applied on low stability
    pub eps_decay: f64,

    /// Divisor applied to the mean inter-node distance feature
    pub distance_norm: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 3,
            stability_threshold: 0.5,
            eps_decay: 0.9,
            distance_norm: 20.0,
        }
    }
}

impl GroupingConfig {
    /// Create a new configuration with custom values
    pub fn new(
        eps: f64,
        min_samples: usize,
        stability_threshold: f64,
        eps_decay: f64,
        distance_norm: f64,
    ) -> Self {
        Self {
            eps,
            min_samples,
            stability_threshold,
            eps_decay,
            distance_norm,
        }
    }
}
