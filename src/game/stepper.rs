//! Fixed-timestep accumulator. Frame time is variable; the rigid-body
//! world must advance in constant substeps, so leftover time carries from
//! frame to frame instead of being simulated or discarded.

/// Accumulator state persisting across frames.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    timestep: f32,
    max_frame_time: f32,
    accumulator: f32,
}

impl FixedStepper {
    /// `timestep` is the fixed substep length; `max_frame_time` caps how
    /// much wall-clock time a single frame may contribute, so one slow
    /// frame cannot demand an unbounded catch-up burst.
    pub fn new(timestep: f32, max_frame_time: f32) -> Self {
        Self {
            timestep,
            max_frame_time,
            accumulator: 0.0,
        }
    }

    /// Feeds one frame's elapsed time and returns how many whole substeps
    /// the simulation should run now. The sub-timestep remainder stays in
    /// the accumulator.
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        self.accumulator += frame_time.clamp(0.0, self.max_frame_time);
        let mut steps = 0;
        while self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            steps += 1;
        }
        steps
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }
}
