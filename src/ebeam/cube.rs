// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Beam cubes stored in HDF5 files.
//!
//! A beam file has three datasets of `f64`: `ebeam_re` and `ebeam_im`, the real
//! and imaginary parts of the cube with shape (l, m, frequency,
//! [`EBEAM_NPOL`]), and `extents`, the six values described by
//! [`BeamExtents::from_slice`].

use std::path::Path;

use log::debug;
use ndarray::{prelude::*, Zip};
use num_complex::Complex;

use super::{BeamExtents, EBeamError, InitBeamCubeError};
use crate::{
    constants::{BEAM_FILE_ENV_VAR, EBEAM_NPOL},
    dims::{ConstData, DimField},
    types::EBeamFloat,
};

const RE_KEY: &str = "ebeam_re";
const IM_KEY: &str = "ebeam_im";
const EXTENTS_KEY: &str = "extents";

/// A sampled beam and the region of (l, m, frequency) space it covers.
#[derive(Debug, Clone)]
pub struct BeamCube<FT> {
    /// Shape (beam_lw, beam_mh, beam_nud, [`EBEAM_NPOL`]).
    pub e_beam: Array4<Complex<FT>>,

    pub extents: BeamExtents<FT>,
}

impl<FT: EBeamFloat> BeamCube<FT> {
    /// Create a [`BeamCube`] from an existing array and extents. The cube must
    /// have [`EBEAM_NPOL`] polarisations and at least one sample along every
    /// other axis.
    pub fn from_parts(
        e_beam: Array4<Complex<FT>>,
        extents: BeamExtents<FT>,
    ) -> Result<BeamCube<FT>, EBeamError> {
        let (beam_lw, beam_mh, beam_nud, npol) = e_beam.dim();
        if npol != EBEAM_NPOL {
            return Err(EBeamError::InputShape {
                name: "e_beam",
                expected: vec![beam_lw, beam_mh, beam_nud, EBEAM_NPOL],
                got: e_beam.shape().to_vec(),
            });
        }
        for (name, size) in [
            ("beam_lw", beam_lw),
            ("beam_mh", beam_mh),
            ("beam_nud", beam_nud),
        ] {
            if size == 0 {
                return Err(EBeamError::EmptyBeamDimension { name });
            }
        }
        extents.validate()?;
        Ok(BeamCube { e_beam, extents })
    }

    /// Given the path to an HDF5 beam file, read a new [`BeamCube`].
    pub fn new<T: AsRef<Path>>(file: T) -> Result<BeamCube<FT>, InitBeamCubeError> {
        // so that libhdf5 doesn't print errors to stdout
        hdf5::silence_errors(true);

        // If the file doesn't exist, hdf5::File::open will handle it, but the
        // error message is horrendous.
        if !file.as_ref().exists() {
            return Err(InitBeamCubeError::BeamFileDoesntExist(
                file.as_ref().display().to_string(),
            ));
        }
        let h5 = hdf5::File::open(file.as_ref())?;

        let re = read_cube_part(&h5, RE_KEY)?;
        let im = read_cube_part(&h5, IM_KEY)?;
        if re.shape() != im.shape() {
            return Err(InitBeamCubeError::ReImShapeMismatch {
                re: re.shape().to_vec(),
                im: im.shape().to_vec(),
            });
        }
        let e_beam = Zip::from(&re).and(&im).map_collect(|&re, &im| {
            Complex::new(FT::from_f64_lossy(re), FT::from_f64_lossy(im))
        });

        let extents: Vec<FT> = h5
            .dataset(EXTENTS_KEY)?
            .read_raw::<f64>()?
            .into_iter()
            .map(FT::from_f64_lossy)
            .collect();
        let extents = BeamExtents::from_slice(&extents)?;

        debug!(
            "Read a {:?} beam cube from '{}'",
            e_beam.dim(),
            file.as_ref().display()
        );
        Ok(BeamCube::from_parts(e_beam, extents)?)
    }

    /// Create a new [`BeamCube`] from the `RIME_BEAM_FILE` environment
    /// variable.
    pub fn new_from_env() -> Result<BeamCube<FT>, InitBeamCubeError> {
        match std::env::var(BEAM_FILE_ENV_VAR) {
            Ok(f) => Self::new(f),
            Err(e) => Err(InitBeamCubeError::BeamFileVarError(e)),
        }
    }

    /// Write this cube to a new HDF5 file. Any existing file is overwritten.
    pub fn write<T: AsRef<Path>>(&self, file: T) -> Result<(), InitBeamCubeError> {
        hdf5::silence_errors(true);

        let h5 = hdf5::File::create(file.as_ref())?;
        let re = self.e_beam.mapv(|c| c.re.to_f64().unwrap_or(f64::NAN));
        let im = self.e_beam.mapv(|c| c.im.to_f64().unwrap_or(f64::NAN));
        let extents: Array1<f64> = self
            .extents
            .to_array()
            .iter()
            .map(|e| e.to_f64().unwrap_or(f64::NAN))
            .collect();
        h5.new_dataset_builder().with_data(&re).create(RE_KEY)?;
        h5.new_dataset_builder().with_data(&im).create(IM_KEY)?;
        h5.new_dataset_builder()
            .with_data(&extents)
            .create(EXTENTS_KEY)?;
        Ok(())
    }

    /// The cube's (l, m, frequency) dimensions.
    pub fn dims(&self) -> (usize, usize, usize) {
        let (beam_lw, beam_mh, beam_nud, _) = self.e_beam.dim();
        (beam_lw, beam_mh, beam_nud)
    }

    /// Build the [`ConstData`] for a kernel that samples this cube. An error
    /// is returned if the cube's dimensions don't fit in [`ConstData`].
    pub fn const_data(
        &self,
        nsrc: i32,
        ntime: i32,
        na: i32,
        nchan: DimField,
    ) -> Result<ConstData, EBeamError> {
        let (beam_lw, beam_mh, beam_nud) = self.dims();
        Ok(ConstData::new(
            nsrc,
            ntime,
            na,
            nchan,
            dim_to_i32("beam_lw", beam_lw)?,
            dim_to_i32("beam_mh", beam_mh)?,
            dim_to_i32("beam_nud", beam_nud)?,
        ))
    }

    /// Sample the cube at a single direction and frequency. See
    /// [`sample_beam`](super::sample_beam).
    pub fn sample(&self, l: FT, m: FT, freq_hz: FT) -> [Complex<FT>; EBEAM_NPOL] {
        super::sample_beam(self.e_beam.view(), &self.extents, l, m, freq_hz)
    }
}

fn dim_to_i32(name: &'static str, value: usize) -> Result<i32, EBeamError> {
    i32::try_from(value).map_err(|_| EBeamError::DimensionTooLarge { name, value })
}

/// Read one of the real-valued 4D cube datasets.
fn read_cube_part(h5: &hdf5::File, key: &'static str) -> Result<Array4<f64>, InitBeamCubeError> {
    let dataset = h5.dataset(key)?;
    let shape = dataset.shape();
    let bad_shape = || InitBeamCubeError::CubeShape {
        key,
        npol: EBEAM_NPOL,
        shape: shape.clone(),
    };
    let &[beam_lw, beam_mh, beam_nud, npol] = shape.as_slice() else {
        return Err(bad_shape());
    };
    if npol != EBEAM_NPOL {
        return Err(bad_shape());
    }
    let data = dataset.read_raw::<f64>()?;
    Array4::from_shape_vec((beam_lw, beam_mh, beam_nud, npol), data).map_err(|_| bad_shape())
}

#[cfg(test)]
mod tests {
    use approx::*;
    use num_complex::Complex64;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn test_cube() -> BeamCube<f64> {
        let e_beam = Array4::from_shape_fn((5, 4, 3, EBEAM_NPOL), |(l, m, f, p)| {
            Complex64::new(l as f64 - 2.0, 0.5 * m as f64 + f as f64) * (p as f64 + 1.0)
        });
        let extents = BeamExtents::new([-0.5, -0.4, 1.0e8], [0.5, 0.4, 2.0e8]);
        BeamCube::from_parts(e_beam, extents).unwrap()
    }

    #[test]
    #[serial]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cube.h5");
        let cube = test_cube();
        cube.write(&path).unwrap();

        let read = BeamCube::<f64>::new(&path).unwrap();
        assert_eq!(read.dims(), (5, 4, 3));
        assert_eq!(read.extents, cube.extents);
        assert_abs_diff_eq!(read.e_beam, cube.e_beam);

        // Single precision reads the same file.
        let read32 = BeamCube::<f32>::new(&path).unwrap();
        assert_abs_diff_eq!(read32.extents.upper_freq, 2.0e8);
        assert_abs_diff_eq!(read32.e_beam[[4, 3, 2, 3]].re, 8.0);
        assert_abs_diff_eq!(read32.e_beam[[4, 3, 2, 3]].im, 14.0);
    }

    #[test]
    #[serial]
    fn read_from_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cube.h5");
        test_cube().write(&path).unwrap();

        std::env::set_var(BEAM_FILE_ENV_VAR, &path);
        let result = BeamCube::<f64>::new_from_env();
        std::env::remove_var(BEAM_FILE_ENV_VAR);
        assert!(result.is_ok());

        let result = BeamCube::<f64>::new_from_env();
        assert!(matches!(
            result,
            Err(InitBeamCubeError::BeamFileVarError(_))
        ));
    }

    #[test]
    #[serial]
    fn missing_file() {
        let result = BeamCube::<f64>::new("/this/file/does/not/exist.h5");
        assert!(matches!(
            result,
            Err(InitBeamCubeError::BeamFileDoesntExist(_))
        ));
    }

    #[test]
    #[serial]
    fn wrong_polarisation_count_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.h5");
        {
            let h5 = hdf5::File::create(&path).unwrap();
            let bad = Array4::<f64>::zeros((2, 2, 2, 2));
            h5.new_dataset_builder()
                .with_data(&bad)
                .create(RE_KEY)
                .unwrap();
            h5.new_dataset_builder()
                .with_data(&bad)
                .create(IM_KEY)
                .unwrap();
        }
        let result = BeamCube::<f64>::new(&path);
        assert!(matches!(
            result,
            Err(InitBeamCubeError::CubeShape { key: "ebeam_re", .. })
        ));
    }

    #[test]
    fn from_parts_checks() {
        let extents = BeamExtents::new([-0.5, -0.4, 1.0e8], [0.5, 0.4, 2.0e8]);
        let result = BeamCube::from_parts(Array4::<Complex64>::zeros((2, 2, 2, 2)), extents);
        assert!(matches!(result, Err(EBeamError::InputShape { .. })));

        let result = BeamCube::from_parts(Array4::<Complex64>::zeros((2, 0, 2, 4)), extents);
        assert!(matches!(
            result,
            Err(EBeamError::EmptyBeamDimension { name: "beam_mh" })
        ));

        let flipped = BeamExtents::new([0.5, -0.4, 1.0e8], [-0.5, 0.4, 2.0e8]);
        let result = BeamCube::from_parts(Array4::<Complex64>::zeros((2, 2, 2, 4)), flipped);
        assert!(matches!(
            result,
            Err(EBeamError::DegenerateExtent { axis: "l", .. })
        ));
    }

    #[test]
    fn cube_const_data() {
        let cube = test_cube();
        let cd = cube.const_data(3, 2, 8, DimField::new(6)).unwrap();
        assert!(cd.validate().is_ok());
        assert_eq!(cd.beam_dims(), (5, 4, 3));
        assert_eq!(cd.npolchan.global(), 24);
    }

    #[test]
    fn oversized_dims_are_rejected() {
        assert_eq!(dim_to_i32("beam_lw", 50).unwrap(), 50);
        assert_eq!(dim_to_i32("beam_lw", i32::MAX as usize).unwrap(), i32::MAX);
        let result = dim_to_i32("beam_mh", i32::MAX as usize + 1);
        assert!(matches!(
            result,
            Err(EBeamError::DimensionTooLarge {
                name: "beam_mh",
                value: 2147483648
            })
        ));
    }

    #[test]
    fn sample_at_lower_corner() {
        let cube = test_cube();
        let s = cube.sample(-0.5, -0.4, 1.0e8);
        for (p, v) in s.iter().enumerate() {
            assert_abs_diff_eq!(*v, cube.e_beam[[0, 0, 0, p]], epsilon = 1e-12);
        }
    }
}
