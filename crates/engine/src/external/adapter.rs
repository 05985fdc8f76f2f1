//! Contract with the external annealing service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::AdapterError;
use crate::polynomial::Term;

/// Per-call solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterParams {
    pub device_type: String,
    pub num_samples: u32,
    pub var_min: i64,
    pub var_max: i64,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub relaxation_schedule: u32,
}

/// Samples returned by the solver, one integer vector per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    pub samples: Vec<Vec<i64>>,
    #[serde(default)]
    pub energies: Vec<f64>,
}

impl SampleSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// An annealing-style solver reachable from this process.
///
/// Implementations either return integer assignments within their time bound
/// or fail observably.
#[async_trait]
pub trait SolverAdapter: Send + Sync {
    async fn solve(
        &self,
        polynomial: &[Term],
        params: &AdapterParams,
    ) -> Result<SampleSet, AdapterError>;

    fn name(&self) -> &str;
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
