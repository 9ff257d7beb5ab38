// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The E-beam term of the radio interferometer measurement equation (RIME).

For every source, time step, antenna and channel, a source's direction is
rotated by the parallactic angle, perturbed by pointing errors and antenna
scaling, and used to trilinearly interpolate a sampled beam cube over (l, m,
frequency). The result is a complex value per polarisation.
 */

mod constants;
mod device;
mod dims;
pub mod ebeam;
mod ffi;
mod launch;
mod types;

pub use constants::{BEAM_FILE_ENV_VAR, EBEAM_NPOL, NUM_BEAM_EXTENTS};
pub use device::{Cpu, Device, Serial};
pub use dims::{ConstData, DimField};
pub use ebeam::{
    sample_beam, BeamCube, BeamExtents, EBeamError, EBeamInputs, InitBeamCubeError, RimeEBeam,
};
pub use launch::{blocks_required, LaunchParams};
pub use types::{EBeamFloat, Precision};

// Re-exports.
pub use marlu::Jones;
pub use ndarray;
pub use num_complex;
