// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generic types.

use std::fmt::{Debug, Display};

use num_traits::{Float, FloatConst};

use crate::constants::{DOUBLE_BLOCK_DIMS, SINGLE_BLOCK_DIMS};

/// The floating-point precision a kernel runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    /// The default block dimensions (polarised channels, antennas, sources) for
    /// this precision, before they are clamped to the size of the problem.
    pub fn default_block_dims(self) -> [usize; 3] {
        match self {
            Precision::Single => SINGLE_BLOCK_DIMS,
            Precision::Double => DOUBLE_BLOCK_DIMS,
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Precision::Single => "single",
                Precision::Double => "double",
            }
        )
    }
}

/// The floating-point types the E-beam kernel can be instantiated with. The
/// associated complex type is always [`num_complex::Complex<Self>`].
pub trait EBeamFloat:
    Float + FloatConst + Default + Debug + Display + Send + Sync + 'static
{
    /// The precision this type represents.
    const PRECISION: Precision;

    /// Convert from an `f64`. The conversion may lose precision.
    fn from_f64_lossy(v: f64) -> Self;

    /// Convert a grid index.
    fn from_usize(v: usize) -> Self;
}

impl EBeamFloat for f32 {
    const PRECISION: Precision = Precision::Single;

    fn from_f64_lossy(v: f64) -> Self {
        v as f32
    }

    fn from_usize(v: usize) -> Self {
        v as f32
    }
}

impl EBeamFloat for f64 {
    const PRECISION: Precision = Precision::Double;

    fn from_f64_lossy(v: f64) -> Self {
        v
    }

    fn from_usize(v: usize) -> Self {
        v as f64
    }
}
