use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    buffer::{RawImageBuffer, load_raw},
    convert::convert_to_raw,
    error::{QuadError, QuadResult},
    quadrant::{GRID_DIM, Quadrant, extract_sub_block},
    request::{RequestDescriptor, invoke_processor},
};

/// Deployment parameters for one pipeline: buffer dimensions and the
/// well-known file names the external processor agrees on. File names are
/// resolved relative to `workdir`, which is also the processor's working
/// directory.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub input_image: PathBuf,
    pub output_image: PathBuf,
    pub descriptor_file: PathBuf,
    pub processor_exec: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub block_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            input_image: PathBuf::from("imagen_in.img"),
            output_image: PathBuf::from("imagen_out.img"),
            descriptor_file: PathBuf::from("config.txt"),
            processor_exec: PathBuf::from("./procesamiento"),
            input_width: 400,
            input_height: 400,
            output_width: 200,
            output_height: 200,
            block_size: 100,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> QuadResult<()> {
        if self.block_size == 0 {
            return Err(QuadError::shape("block_size must be > 0"));
        }
        let side = GRID_DIM * self.block_size;
        if self.input_width != side || self.input_height != side {
            return Err(QuadError::shape(format!(
                "input dimensions {}x{} do not form a {GRID_DIM}x{GRID_DIM} grid of {}px blocks",
                self.input_width, self.input_height, self.block_size
            )));
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(QuadError::shape("output dimensions must be > 0"));
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> QuadResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open pipeline config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse pipeline config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn input_path(&self) -> PathBuf {
        self.workdir.join(&self.input_image)
    }

    pub fn output_path(&self) -> PathBuf {
        self.workdir.join(&self.output_image)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.workdir.join(&self.descriptor_file)
    }
}

/// The three buffers a finished run hands to the reveal animation.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub quadrant: Quadrant,
    pub source: RawImageBuffer,
    pub selection: RawImageBuffer,
    pub result: RawImageBuffer,
}

/// One selection/processing cycle over the shared buffer paths. Runs are
/// serialized: the shared files are a single-writer handoff, so a new run
/// is rejected while one is active (including its reveal animation, which
/// still reads the run's buffers).
pub struct Pipeline {
    config: PipelineConfig,
    active: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> QuadResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            active: false,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Runs the full handoff: (optionally) convert the source image to the
    /// raw input, write the request descriptor, invoke the processor
    /// synchronously, then load and slice the resulting buffers. On success
    /// the run stays active until `complete_run` — callers end it once the
    /// reveal animation is done.
    #[tracing::instrument(skip(self, source_image), fields(quadrant = quadrant_id))]
    pub fn begin_run(
        &mut self,
        source_image: Option<&Path>,
        quadrant_id: u8,
    ) -> QuadResult<RunOutcome> {
        if self.active {
            return Err(QuadError::RunInProgress);
        }
        self.active = true;
        let outcome = self.run_stages(source_image, quadrant_id);
        if outcome.is_err() {
            // Failed runs reset to idle so the next attempt is not locked out.
            self.active = false;
        }
        outcome
    }

    pub fn complete_run(&mut self) {
        self.active = false;
    }

    fn run_stages(
        &self,
        source_image: Option<&Path>,
        quadrant_id: u8,
    ) -> QuadResult<RunOutcome> {
        let cfg = &self.config;
        let quadrant = Quadrant::from_id(quadrant_id)?;

        if let Some(source) = source_image {
            convert_to_raw(
                source,
                &cfg.input_path(),
                cfg.input_width,
                cfg.input_height,
            )?;
        }

        RequestDescriptor::new(&cfg.input_image, quadrant).write(&cfg.descriptor_path())?;
        invoke_processor(&cfg.processor_exec, &cfg.workdir)?;

        let source = load_raw(&cfg.input_path(), cfg.input_width, cfg.input_height)?;
        let selection = extract_sub_block(&source, quadrant, cfg.block_size)?;
        let result = load_raw(&cfg.output_path(), cfg.output_width, cfg.output_height)?;

        tracing::info!(
            quadrant = quadrant.id,
            source_bytes = source.len(),
            result_bytes = result.len(),
            "processing run complete"
        );

        Ok(RunOutcome {
            quadrant,
            source,
            selection,
            result,
        })
    }
}
