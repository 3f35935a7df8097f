//! voxel_mapping - probabilistic 3D occupancy mapping on an octree
//!
//! This crate maintains a voxel occupancy estimate from range-sensor data.
//! Leaves of a pointer-backed octree store log-odds occupancy, updated
//! incrementally from point clouds with a known sensor origin, and the tree
//! is queryable by coordinate, key, raycast, or bounded traversal.
//!
//! # Features
//!
//! - **Integer key space**: 16 bits per axis, so tree descent is pure bit
//!   arithmetic and depth membership is a mask test
//! - **Bayesian fusion**: additive log-odds hit/miss updates with clamping
//!   and maximum-likelihood reduction
//! - **Scan integration**: 3D-DDA raycasting per beam, deduplicated free and
//!   occupied cell sets, occupied-beats-free conflict resolution
//! - **Lossless pruning**: uniform subtrees collapse into one leaf; lazy
//!   evaluation defers inner-node aggregation for batch updates
//! - **Compact binary I/O**: 2 bits per child slot for a pruned,
//!   maximum-likelihood tree
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use voxel_mapping::{ScanOptions, PointCloud, VoxelMap};
//!
//! let mut map = VoxelMap::new(0.05);
//! let scan: PointCloud = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]
//!   .into_iter()
//!   .collect();
//! map.insert_scan(&scan, Vec3::ZERO, ScanOptions::default());
//!
//! let node = map.search_coord(Vec3::new(1.0, 0.0, 0.0)).unwrap();
//! assert!(map.is_node_occupied(node));
//! ```
//!
//! The tree performs no internal parallelism; all operations run to
//! completion on the caller's thread.

pub mod cell;
pub mod codec;
pub mod error;
pub mod key;
pub mod map;
pub mod node;
pub mod raycast;
pub mod scan;
pub mod sensor;
pub mod traversal;
pub mod tree;

mod io;

// Re-export commonly used items
pub use cell::{log_odds, probability, LogOddsCell, OccupancyCell};
pub use codec::CoordCodec;
pub use error::{MapError, Result};
pub use key::{KeyRay, KeySet, VoxelKey, TREE_DEPTH};
pub use map::{OccupancyMap, VoxelMap};
pub use node::Node;
pub use scan::{PointCloud, Pose, ScanNode, ScanOptions};
pub use sensor::SensorModel;
pub use traversal::{OcTreeVolume, VolumeSplit};
pub use tree::{LeafEntry, LeafIter, OcTree};
