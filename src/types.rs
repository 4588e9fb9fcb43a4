//! Core type definitions for the index.
//!
//! - `LabelType`: caller-chosen identifier for an inserted point
//! - `VectorElement`: trait for vector element types (f32, f64)
//! - `Score`: similarity score, higher means closer

use std::fmt::Debug;
use std::io::{self, Read, Write};

/// Caller-chosen identifier for an inserted point.
pub type LabelType = u64;

/// Similarity score type. Higher values mean closer vectors.
pub type Score = f64;

/// Trait for types that can be used as vector elements.
///
/// Scoring always happens in `f64`, so elements only need lossless
/// widening plus a stable byte encoding for snapshots.
pub trait VectorElement: Copy + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Identifier byte written into snapshot headers.
    const DATA_TYPE_ID: u8;

    /// Convert to f64 for score computation.
    fn to_f64(self) -> f64;

    /// Create from f64.
    fn from_f64(v: f64) -> Self;

    /// Zero value.
    fn zero() -> Self;

    /// Write the element in little-endian encoding.
    fn write_to<W: Write>(self, writer: &mut W) -> io::Result<()>;

    /// Read the element from its little-endian encoding.
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl VectorElement for f32 {
    const DATA_TYPE_ID: u8 = 1;

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn write_to<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    #[inline]
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }
}

impl VectorElement for f64 {
    const DATA_TYPE_ID: u8 = 2;

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn write_to<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    #[inline]
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }
}

/// L2 norm of a vector, accumulated in f64.
#[inline]
pub fn l2_norm<T: VectorElement>(v: &[T]) -> f64 {
    v.iter().map(|&x| x.to_f64() * x.to_f64()).sum::<f64>().sqrt()
}
