use std::time::Duration;

use crate::{
    error::{QuadError, QuadResult},
    quadrant::Quadrant,
};

/// The five reveal stages, entered in strict order and never revisited
/// within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    FadeSource,
    MoveHighlight,
    FadeSelection,
    FadeResult,
    Done,
}

/// Step count and inter-step delay for one fade stage.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct FadeParams {
    pub steps: u32,
    pub delay: Duration,
}

impl FadeParams {
    pub fn new(steps: u32, delay: Duration) -> Self {
        Self { steps, delay }
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SequencerParams {
    pub fade_source: FadeParams,
    pub fade_selection: FadeParams,
    pub fade_result: FadeParams,
    pub highlight_delay: Duration,
}

impl Default for SequencerParams {
    fn default() -> Self {
        let fade = FadeParams::new(6, Duration::from_millis(120));
        Self {
            fade_source: fade,
            fade_selection: fade,
            fade_result: fade,
            highlight_delay: Duration::from_millis(150),
        }
    }
}

impl SequencerParams {
    pub fn validate(&self) -> QuadResult<()> {
        for (name, fade) in [
            ("fade_source", self.fade_source),
            ("fade_selection", self.fade_selection),
            ("fade_result", self.fade_result),
        ] {
            if fade.steps == 0 {
                return Err(QuadError::animation(format!(
                    "{name} step count must be > 0"
                )));
            }
        }
        Ok(())
    }
}

/// Snapshot of the sequencer between ticks. `step` counts completed steps
/// within the current stage and resets to 0 on every stage entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationState {
    pub stage: Stage,
    pub step: u32,
    pub current_quadrant: u8,
    pub target_quadrant: u8,
}

/// Draw commands a tick asks the presentation layer to perform, in order.
/// Rasterization is out of scope; this is the whole contract.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameCmd {
    DrawSource { opacity: f64 },
    DrawGrid,
    DrawHighlight { quadrant: u8 },
    DrawSelection { opacity: f64 },
    DrawResult { opacity: f64 },
}

/// One tick's output: what to draw now, and how long until the next tick.
/// `next_after == None` means the run is complete and no timer should be
/// scheduled.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub cmds: Vec<FrameCmd>,
    pub next_after: Option<Duration>,
}

/// The reveal state machine. Pure and timer-free: an external driver owns
/// the clock and calls `tick` when the previous tick's delay elapses, so
/// every stage is testable without real time. At most one tick is ever
/// pending.
#[derive(Clone, Debug)]
pub struct Sequencer {
    params: SequencerParams,
    state: AnimationState,
}

impl Sequencer {
    pub fn new(params: SequencerParams, target: Quadrant) -> QuadResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: AnimationState {
                stage: Stage::FadeSource,
                step: 0,
                current_quadrant: 1,
                target_quadrant: target.id,
            },
        })
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.stage == Stage::Done
    }

    /// Discards all stage state and starts over from FadeSource. Used when a
    /// new processing run begins mid-animation.
    pub fn reset(&mut self, target: Quadrant) {
        self.state = AnimationState {
            stage: Stage::FadeSource,
            step: 0,
            current_quadrant: 1,
            target_quadrant: target.id,
        };
    }

    pub fn tick(&mut self) -> Tick {
        match self.state.stage {
            Stage::FadeSource => self.tick_fade_source(),
            Stage::MoveHighlight => self.tick_move_highlight(),
            Stage::FadeSelection => {
                let fade = self.params.fade_selection;
                self.tick_fade(fade, Stage::FadeResult, self.params.fade_result.delay, |o| {
                    FrameCmd::DrawSelection { opacity: o }
                })
            }
            Stage::FadeResult => {
                let fade = self.params.fade_result;
                self.tick_fade(fade, Stage::Done, Duration::ZERO, |o| FrameCmd::DrawResult {
                    opacity: o,
                })
            }
            Stage::Done => Tick {
                cmds: Vec::new(),
                next_after: None,
            },
        }
    }

    fn tick_fade_source(&mut self) -> Tick {
        let fade = self.params.fade_source;
        self.state.step += 1;
        let opacity = f64::from(self.state.step) / f64::from(fade.steps);
        let mut cmds = vec![FrameCmd::DrawSource { opacity }];

        if self.state.step >= fade.steps {
            // Grid lines and quadrant numbers appear once the source is
            // fully opaque.
            cmds.push(FrameCmd::DrawGrid);
            self.enter(Stage::MoveHighlight);
            return Tick {
                cmds,
                next_after: Some(self.params.highlight_delay),
            };
        }

        Tick {
            cmds,
            next_after: Some(fade.delay),
        }
    }

    fn tick_move_highlight(&mut self) -> Tick {
        let cmds = vec![
            FrameCmd::DrawSource { opacity: 1.0 },
            FrameCmd::DrawGrid,
            FrameCmd::DrawHighlight {
                quadrant: self.state.current_quadrant,
            },
        ];

        if self.state.current_quadrant >= self.state.target_quadrant {
            self.enter(Stage::FadeSelection);
            return Tick {
                cmds,
                next_after: Some(self.params.fade_selection.delay),
            };
        }

        self.state.current_quadrant += 1;
        Tick {
            cmds,
            next_after: Some(self.params.highlight_delay),
        }
    }

    fn tick_fade(
        &mut self,
        fade: FadeParams,
        next_stage: Stage,
        next_stage_delay: Duration,
        cmd: impl Fn(f64) -> FrameCmd,
    ) -> Tick {
        self.state.step += 1;
        let opacity = f64::from(self.state.step) / f64::from(fade.steps);
        let cmds = vec![cmd(opacity)];

        if self.state.step >= fade.steps {
            self.enter(next_stage);
            let next_after = match next_stage {
                Stage::Done => None,
                _ => Some(next_stage_delay),
            };
            return Tick { cmds, next_after };
        }

        Tick {
            cmds,
            next_after: Some(fade.delay),
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.state.stage = stage;
        self.state.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer(target: u8) -> Sequencer {
        Sequencer::new(SequencerParams::default(), Quadrant::from_id(target).unwrap()).unwrap()
    }

    fn run_to_completion(seq: &mut Sequencer) -> Vec<Tick> {
        let mut ticks = Vec::new();
        loop {
            let tick = seq.tick();
            let done = tick.next_after.is_none();
            ticks.push(tick);
            if done {
                break;
            }
            assert!(ticks.len() < 1000, "sequencer did not terminate");
        }
        ticks
    }

    #[test]
    fn zero_step_fade_is_rejected() {
        let mut params = SequencerParams::default();
        params.fade_selection.steps = 0;
        assert!(Sequencer::new(params, Quadrant::from_id(1).unwrap()).is_err());
    }

    #[test]
    fn fade_source_ramps_linearly_and_ends_with_grid() {
        let mut seq = sequencer(1);
        for step in 1..=6u32 {
            let tick = seq.tick();
            assert_eq!(
                tick.cmds[0],
                FrameCmd::DrawSource {
                    opacity: f64::from(step) / 6.0
                }
            );
            if step < 6 {
                assert_eq!(tick.cmds.len(), 1);
            } else {
                assert_eq!(tick.cmds[1], FrameCmd::DrawGrid);
            }
        }
        assert_eq!(seq.state().stage, Stage::MoveHighlight);
    }

    #[test]
    fn highlight_emits_one_frame_per_quadrant_up_to_target() {
        let mut seq = sequencer(9);
        let ticks = run_to_completion(&mut seq);

        let highlights: Vec<u8> = ticks
            .iter()
            .flat_map(|t| t.cmds.iter())
            .filter_map(|c| match c {
                FrameCmd::DrawHighlight { quadrant } => Some(*quadrant),
                _ => None,
            })
            .collect();
        assert_eq!(highlights, (1..=9).collect::<Vec<u8>>());
    }

    #[test]
    fn target_one_highlights_exactly_once() {
        let mut seq = sequencer(1);
        let ticks = run_to_completion(&mut seq);
        let highlights = ticks
            .iter()
            .flat_map(|t| t.cmds.iter())
            .filter(|c| matches!(c, FrameCmd::DrawHighlight { .. }))
            .count();
        assert_eq!(highlights, 1);
    }

    #[test]
    fn stages_run_in_strict_forward_order() {
        let mut seq = sequencer(16);
        let mut stages = vec![seq.state().stage];
        while !seq.is_done() {
            seq.tick();
            let stage = seq.state().stage;
            if *stages.last().unwrap() != stage {
                stages.push(stage);
            }
        }
        assert_eq!(
            stages,
            vec![
                Stage::FadeSource,
                Stage::MoveHighlight,
                Stage::FadeSelection,
                Stage::FadeResult,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn final_tick_schedules_nothing_and_done_is_inert() {
        let mut seq = sequencer(3);
        let ticks = run_to_completion(&mut seq);
        assert!(ticks.last().unwrap().next_after.is_none());
        assert!(seq.is_done());

        let idle = seq.tick();
        assert!(idle.cmds.is_empty());
        assert!(idle.next_after.is_none());
    }

    #[test]
    fn reset_starts_a_fresh_run() {
        let mut seq = sequencer(5);
        seq.tick();
        seq.tick();
        seq.reset(Quadrant::from_id(2).unwrap());
        let s = seq.state();
        assert_eq!(s.stage, Stage::FadeSource);
        assert_eq!(s.step, 0);
        assert_eq!(s.current_quadrant, 1);
        assert_eq!(s.target_quadrant, 2);
    }
}
