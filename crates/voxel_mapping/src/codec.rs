//! World-coordinate to key-space conversion.
//!
//! The codec is fixed at construction: resolution cannot change on a live
//! tree. World coordinates are metric; a coordinate converts to a key by
//! rounding to the nearest voxel center and offsetting into the unsigned
//! key range. Conversion fails (returns `None`) when any axis falls outside
//! `±2^15` voxels.

use glam::Vec3;

use crate::key::{VoxelKey, KEY_ORIGIN, TREE_DEPTH};

/// Converts between world coordinates and [`VoxelKey`] space.
#[derive(Clone, Debug)]
pub struct CoordCodec {
  resolution: f64,
  resolution_inv: f64,
  /// Voxel edge length per depth: `node_sizes[d] = resolution * 2^(16 - d)`.
  node_sizes: [f64; TREE_DEPTH + 1],
}

impl CoordCodec {
  /// Create a codec for the given finest voxel size in meters.
  ///
  /// # Panics
  /// Panics if `resolution` is not strictly positive.
  pub fn new(resolution: f64) -> Self {
    assert!(resolution > 0.0, "resolution must be positive");
    let mut node_sizes = [0.0; TREE_DEPTH + 1];
    for (depth, size) in node_sizes.iter_mut().enumerate() {
      *size = resolution * (1u32 << (TREE_DEPTH - depth)) as f64;
    }
    Self {
      resolution,
      resolution_inv: 1.0 / resolution,
      node_sizes,
    }
  }

  /// Finest voxel edge length in meters.
  #[inline]
  pub fn resolution(&self) -> f64 {
    self.resolution
  }

  /// Voxel edge length at `depth` (`resolution * 2^(16 - depth)`).
  #[inline]
  pub fn node_size(&self, depth: usize) -> f64 {
    self.node_sizes[depth]
  }

  /// Convert one coordinate axis to its key component.
  #[inline]
  pub fn coord_to_key_axis(&self, coord: f64) -> Option<u16> {
    let cell = (coord * self.resolution_inv).round() as i64 + KEY_ORIGIN as i64;
    if (0..(1i64 << 16)).contains(&cell) {
      Some(cell as u16)
    } else {
      None
    }
  }

  /// Convert a world point to its finest-depth key.
  ///
  /// Returns `None` if any axis is outside the representable range.
  #[inline]
  pub fn coord_to_key(&self, coord: Vec3) -> Option<VoxelKey> {
    Some(VoxelKey([
      self.coord_to_key_axis(coord.x as f64)?,
      self.coord_to_key_axis(coord.y as f64)?,
      self.coord_to_key_axis(coord.z as f64)?,
    ]))
  }

  /// Convert a world point to the masked key of its containing voxel at
  /// `depth`.
  #[inline]
  pub fn coord_to_key_at_depth(&self, coord: Vec3, depth: usize) -> Option<VoxelKey> {
    self.coord_to_key(coord).map(|k| k.at_depth(depth))
  }

  /// Center coordinate of one key component at the finest depth.
  #[inline]
  pub fn key_to_coord_axis(&self, key: u16) -> f64 {
    (key as f64 - KEY_ORIGIN as f64) * self.resolution
  }

  /// World center of the finest-depth voxel addressed by `key`.
  #[inline]
  pub fn key_to_coord(&self, key: VoxelKey) -> Vec3 {
    Vec3::new(
      self.key_to_coord_axis(key[0]) as f32,
      self.key_to_coord_axis(key[1]) as f32,
      self.key_to_coord_axis(key[2]) as f32,
    )
  }

  /// World center of the voxel addressed by `key` at `depth`.
  ///
  /// The low bits of `key` are masked off first; the center is the midpoint
  /// of the depth-`depth` voxel, which for coarse voxels sits between the
  /// centers of the finest voxels it contains.
  pub fn key_to_coord_at_depth(&self, key: VoxelKey, depth: usize) -> Vec3 {
    let masked = key.at_depth(depth);
    let span = (1u32 << (TREE_DEPTH - depth)) as f64;
    let half = (span - 1.0) * 0.5 * self.resolution;
    Vec3::new(
      (self.key_to_coord_axis(masked[0]) + half) as f32,
      (self.key_to_coord_axis(masked[1]) + half) as f32,
      (self.key_to_coord_axis(masked[2]) + half) as f32,
    )
  }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
