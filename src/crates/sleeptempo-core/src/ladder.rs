//! Ordered sequence of tempo steps forming one session

use crate::{Result, TempoError, TempoStep};
use serde::{Deserialize, Serialize};

/// A non-empty, validated list of tempo steps played in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TempoStep>", into = "Vec<TempoStep>")]
pub struct Ladder {
    steps: Vec<TempoStep>,
}

impl Ladder {
    /// Create a ladder, rejecting empty lists and unplayable steps
    pub fn new(steps: Vec<TempoStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(TempoError::EmptyLadder);
        }
        for step in &steps {
            step.validate()?;
        }
        Ok(Ladder { steps })
    }

    pub fn steps(&self) -> &[TempoStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&TempoStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TempoStep> {
        self.steps.iter()
    }

    /// Beats across every step
    pub fn total_beats(&self) -> u64 {
        self.steps.iter().map(|s| s.beats as u64).sum()
    }

    /// Sum of each step's nominal duration, in seconds.
    ///
    /// Real playback runs a little longer: every step waits one beat after its
    /// last click, plus the startup latency of the next step.
    pub fn nominal_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration()).sum()
    }
}

impl Default for Ladder {
    /// 100 beats at 120 BPM, then a ramp down to a long hold at 20 BPM
    fn default() -> Self {
        Ladder {
            steps: vec![
                TempoStep::new(120.0, 100),
                TempoStep::new(100.0, 8),
                TempoStep::new(80.0, 8),
                TempoStep::new(60.0, 8),
                TempoStep::new(40.0, 12),
                TempoStep::new(20.0, 16),
            ],
        }
    }
}

impl TryFrom<Vec<TempoStep>> for Ladder {
    type Error = TempoError;

    fn try_from(steps: Vec<TempoStep>) -> Result<Self> {
        Ladder::new(steps)
    }
}

impl From<Ladder> for Vec<TempoStep> {
    fn from(ladder: Ladder) -> Self {
        ladder.steps
    }
}

impl<'a> IntoIterator for &'a Ladder {
    type Item = &'a TempoStep;
    type IntoIter = std::slice::Iter<'a, TempoStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
