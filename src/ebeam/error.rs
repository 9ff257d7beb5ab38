// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the E-beam.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EBeamError {
    #[error("Dimension '{name}' is negative ({value})")]
    NegativeDimension { name: &'static str, value: i32 },

    #[error("Beam cube dimension '{name}' is 0; the cube needs at least one sample along each axis")]
    EmptyBeamDimension { name: &'static str },

    #[error("Dimension field '{name}' is inconsistent: global size {global_size}, local size {local_size}, extents [{lower_extent}, {upper_extent})")]
    InconsistentDimField {
        name: &'static str,
        global_size: i32,
        local_size: i32,
        lower_extent: i32,
        upper_extent: i32,
    },

    #[error("npolchan ({got}) is not {npol} times nchan ({expected})")]
    PolChanMismatch {
        npol: usize,
        expected: String,
        got: String,
    },

    #[error("npolchan can't be represented: {npol} times nchan ({nchan}) overflows")]
    PolChanOverflow { npol: usize, nchan: String },

    #[error("Dimension '{name}' is too big to describe in the kernel's dimensions ({value})")]
    DimensionTooLarge { name: &'static str, value: usize },

    #[error("Array '{name}' with shape {shape:?} has too many elements")]
    TooManyElements {
        name: &'static str,
        shape: Vec<usize>,
    },

    #[error("Input '{name}' has shape {got:?}, but expected {expected:?}")]
    InputShape {
        name: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("The beam extents along {axis} are degenerate (lower {lower}, upper {upper}); the upper extent must be finite and bigger than the lower")]
    DegenerateExtent {
        axis: &'static str,
        lower: f64,
        upper: f64,
    },

    #[error("Expected {expected} beam extents, but got {got}")]
    ExtentsCount { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum InitBeamCubeError {
    #[error("Specified beam file '{0}' doesn't exist")]
    BeamFileDoesntExist(String),

    /// An error associated with the RIME_BEAM_FILE environment variable.
    #[error("Problem with the RIME_BEAM_FILE variable: {0}")]
    BeamFileVarError(#[from] std::env::VarError),

    #[error("Unexpected shape of HDF5 dataset '{key}': expected 4 dimensions with {npol} polarisations, got {shape:?}")]
    CubeShape {
        key: &'static str,
        npol: usize,
        shape: Vec<usize>,
    },

    #[error("The real ({re:?}) and imaginary ({im:?}) beam datasets have different shapes")]
    ReImShapeMismatch { re: Vec<usize>, im: Vec<usize> },

    #[error(transparent)]
    EBeam(#[from] EBeamError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
