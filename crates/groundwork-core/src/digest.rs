//! Content digests for weight grids

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::grid::WeightGrid;

/// A SHA-256 fingerprint of a weight grid's dimensions and weights.
///
/// Two synthesis runs over identical inputs produce the same digest,
/// which makes regenerated splat maps cheap to compare.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GridDigest([u8; 32]);

impl GridDigest {
    /// Digest a grid. Dimensions are hashed first so that grids with the
    /// same weights but a different shape never collide.
    pub fn of_grid(grid: &WeightGrid) -> Self {
        let mut hasher = Sha256::new();
        for dim in [grid.width(), grid.height(), grid.layers()] {
            hasher.update((dim as u64).to_le_bytes());
        }
        for w in grid.as_slice() {
            hasher.update(w.to_le_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// `sha256:` followed by the full lowercase hex digest
    pub fn to_prefixed_hex(&self) -> String {
        self.to_string()
    }

    fn write_hex(&self, f: &mut fmt::Formatter<'_>, bytes: usize) -> fmt::Result {
        self.0[..bytes].iter().try_for_each(|b| write!(f, "{:02x}", b))
    }
}

impl fmt::Display for GridDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sha256:")?;
        self.write_hex(f, self.0.len())
    }
}

/// Shortened to the first 8 bytes
impl fmt::Debug for GridDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GridDigest(")?;
        self.write_hex(f, 8)?;
        f.write_str("..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    fn grid(size: GridSize, weights: Vec<f32>) -> WeightGrid {
        WeightGrid::from_raw(size, weights).unwrap()
    }

    #[test]
    fn test_identical_grids_match() {
        let a = grid(GridSize::new(2, 1, 2), vec![0.3, 0.7, 1.0, 0.0]);
        let b = grid(GridSize::new(2, 1, 2), vec![0.3, 0.7, 1.0, 0.0]);
        assert_eq!(GridDigest::of_grid(&a), GridDigest::of_grid(&b));
    }

    #[test]
    fn test_shape_changes_digest() {
        let a = grid(GridSize::new(2, 1, 2), vec![1.0, 0.0, 1.0, 0.0]);
        let b = grid(GridSize::new(1, 2, 2), vec![1.0, 0.0, 1.0, 0.0]);
        assert_ne!(GridDigest::of_grid(&a), GridDigest::of_grid(&b));
    }

    #[test]
    fn test_prefixed_hex_format() {
        let d = GridDigest::of_grid(&grid(GridSize::new(1, 1, 1), vec![1.0]));
        let prefixed = d.to_prefixed_hex();
        let hex = prefixed.strip_prefix("sha256:").unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_eq!(format!("{:?}", d), format!("GridDigest({}..)", &hex[..16]));
    }
}
