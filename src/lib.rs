#![forbid(unsafe_code)]

pub mod buffer;
pub mod capture;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod player;
pub mod quadrant;
pub mod request;
pub mod scheduler;
pub mod sequencer;

pub use buffer::{RawImageBuffer, load_raw};
pub use capture::{CaptureDevice, CaptureSession, TestPatternDevice};
pub use error::{QuadError, QuadResult};
pub use pipeline::{Pipeline, PipelineConfig, RunOutcome};
pub use player::{FrameSink, LoggingSink, Player, RecordingSink};
pub use quadrant::{GRID_DIM, QUADRANT_COUNT, Quadrant, extract_sub_block};
pub use request::RequestDescriptor;
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, TaskHandle};
pub use sequencer::{
    AnimationState, FadeParams, FrameCmd, Sequencer, SequencerParams, Stage, Tick,
};
