//! Compact binary serialization of a pruned, thresholded tree.
//!
//! Stream layout:
//!
//! ```text
//! <tree id string> '\n'
//! resolution: f64, native endian
//! node count: u32, native endian
//! root subtree, 2 bits per child slot
//! ```
//!
//! Each node contributes 16 bits, packed least-significant pair first in
//! slot order: `00` no child, `01` free leaf, `10` occupied leaf, `11`
//! inner child. After the 16 bits, inner children follow recursively in
//! slot order. Leaves materialize at the clamping bounds, so the format
//! only round-trips exactly for a maximum-likelihood tree.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, warn};

use crate::cell::OccupancyCell;
use crate::error::{MapError, Result};
use crate::map::OccupancyMap;
use crate::node::Node;
use crate::sensor::SensorModel;

/// Longest accepted tree id line, a guard against unbounded header reads.
const MAX_HEADER_LEN: usize = 256;

impl<C: OccupancyCell> OccupancyMap<C> {
  /// Write the tree to a binary stream, first reducing it to the maximum
  /// likelihood estimate and pruning it for maximum compression.
  pub fn write_binary<W: Write>(&mut self, writer: &mut W) -> Result<()> {
    self.to_max_likelihood();
    self.prune();
    self.write_binary_const(writer)
  }

  /// Write the tree to a binary stream without modifying it.
  ///
  /// Streams are smaller when the tree is pruned first; occupancy is
  /// thresholded on the fly, so a non-maximum-likelihood tree loses its
  /// intermediate log-odds values.
  pub fn write_binary_const<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_all(C::TREE_ID.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.write_f64::<NativeEndian>(self.resolution())?;
    let num_nodes = self.tree().size() as u32;
    writer.write_u32::<NativeEndian>(num_nodes)?;
    Self::write_node(writer, self.tree().root(), self.sensor())?;
    debug!(num_nodes, "wrote binary tree");
    Ok(())
  }

  fn write_node<W: Write>(writer: &mut W, node: &Node<C>, sensor: &SensorModel) -> Result<()> {
    let mut bits: u16 = 0;
    for octant in 0..8 {
      let code: u16 = match node.child(octant) {
        None => 0b00,
        Some(child) if child.has_children() => 0b11,
        Some(child) if child.log_odds() >= sensor.occupancy_thres_log() => 0b10,
        Some(_) => 0b01,
      };
      bits |= code << (octant * 2);
    }
    writer.write_u8((bits & 0xff) as u8)?;
    writer.write_u8((bits >> 8) as u8)?;
    for octant in 0..8 {
      if (bits >> (octant * 2)) & 0b11 == 0b11 {
        Self::write_node(writer, node.child(octant).expect("inner code implies child"), sensor)?;
      }
    }
    Ok(())
  }

  /// Read a tree from a binary stream, replacing the current contents.
  ///
  /// Existing nodes are deleted before reading. On any error the tree is
  /// left cleared. The stream's resolution replaces the tree's.
  pub fn read_binary<R: Read>(&mut self, reader: &mut R) -> Result<()> {
    let result = self.read_binary_inner(reader);
    if result.is_err() {
      self.clear();
    }
    result
  }

  fn read_binary_inner<R: Read>(&mut self, reader: &mut R) -> Result<()> {
    let header = Self::read_header(reader)?;
    if header != C::TREE_ID {
      return Err(MapError::UnknownHeader(header));
    }
    let resolution = reader.read_f64::<NativeEndian>()?;
    if !(resolution.is_finite() && resolution > 0.0) {
      return Err(MapError::Malformed(format!("resolution {resolution}")));
    }
    let num_nodes = reader.read_u32::<NativeEndian>()?;
    if num_nodes == 0 {
      return Err(MapError::Malformed("node count 0".into()));
    }

    self.clear();
    self.tree_mut().reset_codec(resolution);
    let sensor = *self.sensor();
    let read_nodes = Self::read_node(reader, self.tree_mut().root_mut(), &sensor)?;
    if read_nodes != num_nodes as usize {
      warn!(num_nodes, read_nodes, "node count mismatch in binary stream");
    }
    self.update_inner_occupancy();
    debug!(read_nodes, "read binary tree");
    Ok(())
  }

  /// Returns the number of nodes in the subtree, including `node`.
  fn read_node<R: Read>(reader: &mut R, node: &mut Node<C>, sensor: &SensorModel) -> Result<usize> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    let bits = buf[0] as u16 | (buf[1] as u16) << 8;

    let mut count = 1;
    for octant in 0..8 {
      match (bits >> (octant * 2)) & 0b11 {
        0b00 => {}
        0b01 => {
          node.create_child(octant).set_log_odds(sensor.clamping_thres_min());
          count += 1;
        }
        0b10 => {
          node.create_child(octant).set_log_odds(sensor.clamping_thres_max());
          count += 1;
        }
        _ => {
          node.create_child(octant);
        }
      }
    }
    for octant in 0..8 {
      if (bits >> (octant * 2)) & 0b11 == 0b11 {
        count +=
          Self::read_node(reader, node.child_mut(octant).expect("created above"), sensor)?;
      }
    }
    Ok(count)
  }

  fn read_header<R: Read>(reader: &mut R) -> Result<String> {
    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    loop {
      reader.read_exact(&mut byte)?;
      if byte[0] == b'\n' {
        break;
      }
      if header.len() >= MAX_HEADER_LEN {
        return Err(MapError::Malformed("unterminated header".into()));
      }
      header.push(byte[0]);
    }
    String::from_utf8(header).map_err(|_| MapError::Malformed("non-utf8 header".into()))
  }

  /// Write the tree to a file via [`write_binary`](OccupancyMap::write_binary).
  pub fn write_binary_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    self.write_binary(&mut writer)?;
    writer.flush()?;
    Ok(())
  }

  /// Write the tree to a file without modifying it.
  pub fn write_binary_const_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    self.write_binary_const(&mut writer)?;
    writer.flush()?;
    Ok(())
  }

  /// Read a tree from a file via [`read_binary`](OccupancyMap::read_binary).
  pub fn read_binary_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    self.read_binary(&mut reader)
  }
}

#[cfg(test)]
#[path = "io_test.rs"]
mod io_test;
