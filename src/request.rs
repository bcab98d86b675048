use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    error::{QuadError, QuadResult},
    quadrant::Quadrant,
};

/// The two-line handoff file the external processor reads from its working
/// directory: the input raw-buffer name, then the quadrant id as decimal
/// text, each newline-terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub input_image: PathBuf,
    pub quadrant_id: u8,
}

impl RequestDescriptor {
    /// Taking a `Quadrant` (not a bare id) means the id has already been
    /// range-checked.
    pub fn new(input_image: impl Into<PathBuf>, quadrant: Quadrant) -> Self {
        Self {
            input_image: input_image.into(),
            quadrant_id: quadrant.id,
        }
    }

    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.input_image.display(), self.quadrant_id)
    }

    /// Overwrites any previous descriptor; the file is never reused across
    /// runs. An I/O failure here aborts the run before the processor is
    /// invoked.
    pub fn write(&self, path: &Path) -> QuadResult<()> {
        std::fs::write(path, self.render()).map_err(|source| QuadError::DescriptorWriteFailed {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Launches the external processor with no arguments, blocking until it
/// exits. It reads the descriptor and input buffer from `workdir` and writes
/// the output buffer there. Its stdout/stderr are captured and kept out of
/// the user-facing surface; they only reach the debug log.
pub fn invoke_processor(exec: &Path, workdir: &Path) -> QuadResult<()> {
    let exec = if exec.is_relative() {
        workdir.join(exec)
    } else {
        exec.to_path_buf()
    };
    let tool = exec.display().to_string();
    let mut cmd = Command::new(&exec);
    cmd.current_dir(workdir);
    run_silenced(&tool, cmd)
}

/// Runs a tool to completion with stdin closed and stdout/stderr captured.
/// A missing executable maps to `ExternalToolNotFound`, a non-zero exit to
/// `ExternalToolFailed`; captured output is logged at debug level only.
pub(crate) fn run_silenced(tool: &str, mut cmd: Command) -> QuadResult<()> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            QuadError::tool_not_found(tool)
        } else {
            QuadError::Other(anyhow::Error::new(e).context(format!("failed to launch '{tool}'")))
        }
    })?;

    if !output.stdout.is_empty() {
        tracing::debug!(tool, stdout = %String::from_utf8_lossy(&output.stdout).trim(), "tool output");
    }
    if !output.stderr.is_empty() {
        tracing::debug!(tool, stderr = %String::from_utf8_lossy(&output.stderr).trim(), "tool diagnostics");
    }

    if !output.status.success() {
        return Err(QuadError::ExternalToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
        });
    }

    Ok(())
}
