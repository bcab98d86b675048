use crate::{
    buffer::RawImageBuffer,
    error::{QuadError, QuadResult},
};

/// Quadrants tile the parent buffer in a fixed 4x4 grid, addressed 1..=16
/// row-major.
pub const GRID_DIM: u32 = 4;
pub const QUADRANT_COUNT: u8 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quadrant {
    pub id: u8,
    pub row: u32,
    pub col: u32,
}

impl Quadrant {
    /// Derives the grid position for a 1-based quadrant id. An out-of-range
    /// id is a caller contract violation and is rejected before any buffer
    /// access.
    pub fn from_id(id: u8) -> QuadResult<Self> {
        if !(1..=QUADRANT_COUNT).contains(&id) {
            return Err(QuadError::InvalidQuadrant(id));
        }
        let q = u32::from(id - 1);
        Ok(Self {
            id,
            row: q / GRID_DIM,
            col: q % GRID_DIM,
        })
    }

    /// Top-left pixel of this quadrant's block in the parent buffer.
    pub fn origin(&self, block_size: u32) -> (u32, u32) {
        (self.row * block_size, self.col * block_size)
    }
}

/// Copies the quadrant's `block_size` x `block_size` region out of the parent
/// buffer. The parent must be exactly `GRID_DIM * block_size` in each axis;
/// anything else is a precondition failure, since the parent is expected to
/// have passed raw-buffer validation at the grid's fixed size already.
pub fn extract_sub_block(
    buffer: &RawImageBuffer,
    quadrant: Quadrant,
    block_size: u32,
) -> QuadResult<RawImageBuffer> {
    let side = GRID_DIM * block_size;
    if buffer.width != side || buffer.height != side {
        return Err(QuadError::shape(format!(
            "parent buffer is {}x{}, expected {side}x{side} for a {GRID_DIM}x{GRID_DIM} grid of {block_size}px blocks",
            buffer.width, buffer.height
        )));
    }

    let (row_start, col_start) = quadrant.origin(block_size);
    let mut pixels = Vec::with_capacity(block_size as usize * block_size as usize);
    for y in row_start..row_start + block_size {
        let row = buffer.row(y);
        pixels.extend_from_slice(&row[col_start as usize..(col_start + block_size) as usize]);
    }

    RawImageBuffer::new(block_size, block_size, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn rejects_out_of_range_ids() {
        assert!(matches!(
            Quadrant::from_id(0),
            Err(QuadError::InvalidQuadrant(0))
        ));
        assert!(matches!(
            Quadrant::from_id(17),
            Err(QuadError::InvalidQuadrant(17))
        ));
    }

    #[test]
    fn row_col_formulas_are_bijective() {
        let mut seen = BTreeSet::new();
        for id in 1..=QUADRANT_COUNT {
            let q = Quadrant::from_id(id).unwrap();
            assert_eq!(q.row, u32::from(id - 1) / 4);
            assert_eq!(q.col, u32::from(id - 1) % 4);
            assert!(q.row < 4 && q.col < 4);
            assert!(seen.insert((q.row, q.col)), "duplicate cell for id {id}");
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn sub_block_is_exactly_block_sized() {
        let parent = RawImageBuffer::new(400, 400, vec![7u8; 160_000]).unwrap();
        let q = Quadrant::from_id(11).unwrap();
        let sub = extract_sub_block(&parent, q, 100).unwrap();
        assert_eq!(sub.len(), 10_000);
        assert_eq!((sub.width, sub.height), (100, 100));
    }

    #[test]
    fn reassembling_all_sub_blocks_reconstructs_parent() {
        // Distinct byte per position so misplacement is detectable.
        let pixels: Vec<u8> = (0..160_000usize).map(|i| (i % 255) as u8).collect();
        let parent = RawImageBuffer::new(400, 400, pixels).unwrap();

        let mut rebuilt = vec![0u8; 160_000];
        for id in 1..=QUADRANT_COUNT {
            let q = Quadrant::from_id(id).unwrap();
            let sub = extract_sub_block(&parent, q, 100).unwrap();
            let (row_start, col_start) = q.origin(100);
            for y in 0..100u32 {
                let dst = (row_start + y) as usize * 400 + col_start as usize;
                rebuilt[dst..dst + 100].copy_from_slice(sub.row(y));
            }
        }
        assert_eq!(rebuilt, parent.pixels);
    }

    #[test]
    fn mismatched_parent_is_a_precondition_failure() {
        let parent = RawImageBuffer::new(200, 200, vec![0u8; 40_000]).unwrap();
        let q = Quadrant::from_id(1).unwrap();
        assert!(matches!(
            extract_sub_block(&parent, q, 100),
            Err(QuadError::BufferShape(_))
        ));
    }
}
