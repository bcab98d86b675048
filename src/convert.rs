use std::{path::Path, process::Command};

use crate::{error::QuadResult, request::run_silenced};

const CONVERT_TOOL: &str = "convert";

/// Checks for ImageMagick's `convert` without touching any files.
pub fn is_convert_on_path() -> bool {
    Command::new(CONVERT_TOOL)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Converts an arbitrary source image into the headerless grayscale raw
/// format at exactly `width` x `height` (aspect ratio is forced, matching
/// the fixed-dimension handoff contract). The conversion itself is owned by
/// ImageMagick; this is only the invocation.
#[tracing::instrument(skip(source, dest), fields(source = %source.display(), dest = %dest.display()))]
pub fn convert_to_raw(source: &Path, dest: &Path, width: u32, height: u32) -> QuadResult<()> {
    if !is_convert_on_path() {
        return Err(crate::error::QuadError::tool_not_found(CONVERT_TOOL));
    }

    let mut cmd = Command::new(CONVERT_TOOL);
    cmd.arg(source)
        .args(["-colorspace", "Gray", "-depth", "8", "-resize"])
        .arg(format!("{width}x{height}!"))
        .args(["-type", "Grayscale"])
        .arg(format!("gray:{}", dest.display()));

    run_silenced(CONVERT_TOOL, cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuadError;

    #[test]
    fn missing_convert_like_tool_maps_to_not_found() {
        // Exercise the shared launcher with a name that cannot exist rather
        // than depending on ImageMagick being absent from the test host.
        let cmd = Command::new("quadreveal-no-such-convert");
        let err = run_silenced("quadreveal-no-such-convert", cmd).unwrap_err();
        assert!(matches!(err, QuadError::ExternalToolNotFound { .. }));
    }
}
