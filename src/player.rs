use crate::{
    error::QuadResult,
    scheduler::{Clock, Scheduler},
    sequencer::{AnimationState, FrameCmd, Sequencer},
};

/// Receives each presented tick. Rasterization/widgets live behind this
/// seam; the library only decides what to draw and when.
pub trait FrameSink {
    fn present(&mut self, state: AnimationState, cmds: &[FrameCmd]);
}

/// Sink for headless runs: one log line per presented frame.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl FrameSink for LoggingSink {
    fn present(&mut self, state: AnimationState, cmds: &[FrameCmd]) {
        tracing::info!(stage = ?state.stage, step = state.step, ?cmds, "frame");
    }
}

/// Sink that records every presented tick, for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<(AnimationState, Vec<FrameCmd>)>,
}

impl FrameSink for RecordingSink {
    fn present(&mut self, state: AnimationState, cmds: &[FrameCmd]) {
        self.frames.push((state, cmds.to_vec()));
    }
}

/// Drives a sequencer run through the cooperative timer loop: tick, present,
/// schedule the next tick after the delay the tick asked for. There is at
/// most one pending timer at any point, and it belongs to this playback
/// alone, so tearing the loop down cancels nothing but its own work.
pub struct Player<C: Clock> {
    clock: C,
}

impl<C: Clock> Player<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Plays the sequencer to completion. Returns the number of presented
    /// frames.
    pub fn play(&self, sequencer: &mut Sequencer, sink: &mut dyn FrameSink) -> QuadResult<u64> {
        let mut scheduler: Scheduler<()> = Scheduler::new();
        scheduler.schedule(self.clock.now(), ());

        let mut presented = 0u64;
        while let Some(due) = scheduler.next_due() {
            let now = self.clock.now();
            if due > now {
                self.clock.sleep(due - now);
            }
            let now = self.clock.now();
            if scheduler.pop_due(now).is_none() {
                continue;
            }

            let tick = sequencer.tick();
            let state = sequencer.state();
            if !tick.cmds.is_empty() {
                sink.present(state, &tick.cmds);
                presented += 1;
            }
            if let Some(delay) = tick.next_after {
                scheduler.schedule_after(now, delay, ());
            }
        }

        Ok(presented)
    }
}
