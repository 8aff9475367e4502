/// Converts wall-clock frames into physics timescales. One timescale unit is
/// one `interval_ms`; frames arriving early produce no step.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    interval_ms: u64,
    max_timescale: f32,
    last_step_at: Option<u64>,
}

impl FixedTimestep {
    pub fn new(interval_ms: u64, max_timescale: f32) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            max_timescale,
            last_step_at: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns the timescale to integrate if at least one interval has
    /// elapsed since the previous step. The first call only anchors time.
    pub fn advance(&mut self, now_ms: u64) -> Option<f32> {
        let Some(last) = self.last_step_at else {
            self.last_step_at = Some(now_ms);
            return None;
        };

        let elapsed = now_ms.saturating_sub(last);
        if elapsed < self.interval_ms {
            return None;
        }

        self.last_step_at = Some(now_ms);
        let timescale = elapsed as f32 / self.interval_ms as f32;
        Some(timescale.min(self.max_timescale))
    }

    pub fn reset(&mut self) {
        self.last_step_at = None;
    }
}
