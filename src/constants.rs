// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.

/// Number of polarisations handled by the E-beam kernel.
pub const EBEAM_NPOL: usize = 4;

/// The number of values describing the beam cube's extents: lower l, lower m,
/// lower frequency, upper l, upper m, upper frequency.
pub const NUM_BEAM_EXTENTS: usize = 6;

/// The environment variable used to find an HDF5 beam cube.
pub const BEAM_FILE_ENV_VAR: &str = "RIME_BEAM_FILE";

/// Single-precision block dimensions (polarised channels, antennas, sources).
pub(crate) const SINGLE_BLOCK_DIMS: [usize; 3] = [32, 32, 1];

/// Double-precision block dimensions (polarised channels, antennas, sources).
/// Fewer antennas per block than single precision.
pub(crate) const DOUBLE_BLOCK_DIMS: [usize; 3] = [32, 16, 1];
