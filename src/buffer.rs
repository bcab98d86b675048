use std::path::Path;

use anyhow::Context as _;

use crate::error::{QuadError, QuadResult};

/// A headerless grayscale raster: one byte per pixel, row-major, stride = width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawImageBuffer {
    /// Constructs a buffer, enforcing `pixels.len() == width * height` exactly.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> QuadResult<Self> {
        let expected = expected_len(width, height);
        if pixels.len() != expected {
            return Err(QuadError::shape(format!(
                "pixel count mismatch: got {}, expected {} ({}x{})",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    /// Persists the buffer back to a headerless raw file (snapshot commit path).
    pub fn save(&self, path: &Path) -> QuadResult<()> {
        std::fs::write(path, &self.pixels)
            .with_context(|| format!("write raw buffer '{}'", path.display()))?;
        Ok(())
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Reads a raw grayscale buffer of the given dimensions from storage.
///
/// A short file is fatal. An oversized file is truncated to the expected
/// byte count and reported once as a warning; callers proceed with the
/// leading `width * height` bytes. Every call re-reads from storage — the
/// underlying file is expected to change between processing runs, so
/// nothing is cached.
pub fn load_raw(path: &Path, width: u32, height: u32) -> QuadResult<RawImageBuffer> {
    let mut data =
        std::fs::read(path).with_context(|| format!("read raw buffer '{}'", path.display()))?;

    let expected = expected_len(width, height);
    if data.len() < expected {
        return Err(QuadError::IncompleteBuffer {
            path: path.display().to_string(),
            expected,
            actual: data.len(),
        });
    }
    if data.len() > expected {
        tracing::warn!(
            path = %path.display(),
            expected,
            actual = data.len(),
            "raw buffer larger than expected; ignoring trailing bytes"
        );
        data.truncate(expected);
    }

    RawImageBuffer::new(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();
        path
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(RawImageBuffer::new(4, 4, vec![0u8; 15]).is_err());
        assert!(RawImageBuffer::new(4, 4, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn load_exact_size_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "exact.img", 400 * 400);
        let buf = load_raw(&path, 400, 400).unwrap();
        assert_eq!(buf.len(), 160_000);
        assert_eq!(buf.row(0)[0], 0);
    }

    #[test]
    fn load_short_file_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "short.img", 400 * 400 - 1);
        match load_raw(&path, 400, 400) {
            Err(QuadError::IncompleteBuffer {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 160_000);
                assert_eq!(actual, 159_999);
            }
            other => panic!("expected IncompleteBuffer, got {other:?}"),
        }
    }

    #[test]
    fn load_oversized_file_truncates_to_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "long.img", 400 * 400 + 37);
        let buf = load_raw(&path, 400, 400).unwrap();
        assert_eq!(buf.len(), 160_000);

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(buf.pixels[..], on_disk[..160_000]);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_raw(&dir.path().join("nope.img"), 4, 4).unwrap_err();
        assert!(err.to_string().contains("nope.img"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.img");
        let buf = RawImageBuffer::new(8, 4, (0..32u8).collect()).unwrap();
        buf.save(&path).unwrap();
        assert_eq!(load_raw(&path, 8, 4).unwrap(), buf);
    }
}
