// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code for the E-beam term of the RIME.

mod cube;
mod error;
mod ffi;
mod interpolate;

pub use cube::BeamCube;
pub use error::{EBeamError, InitBeamCubeError};
pub use interpolate::sample_beam;

use std::marker::PhantomData;

use log::{debug, trace};
use marlu::Jones;
use ndarray::prelude::*;
use num_complex::Complex;

use crate::{
    constants::{EBEAM_NPOL, NUM_BEAM_EXTENTS},
    device::{Cpu, Device},
    dims::ConstData,
    launch::LaunchParams,
    types::EBeamFloat,
};

/// The region of (l, m, frequency) space covered by a beam cube. The first
/// sample of the cube along each axis is at the lower extent, the last sample
/// at the upper extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamExtents<FT> {
    pub lower_l: FT,
    pub lower_m: FT,
    /// \[Hz\]
    pub lower_freq: FT,
    pub upper_l: FT,
    pub upper_m: FT,
    /// \[Hz\]
    pub upper_freq: FT,
}

impl<FT: EBeamFloat> BeamExtents<FT> {
    /// Create new extents from the lower and upper (l, m, frequency) corners.
    pub fn new(lower: [FT; 3], upper: [FT; 3]) -> BeamExtents<FT> {
        BeamExtents {
            lower_l: lower[0],
            lower_m: lower[1],
            lower_freq: lower[2],
            upper_l: upper[0],
            upper_m: upper[1],
            upper_freq: upper[2],
        }
    }

    /// Read extents from a slice ordered `[lower_l, lower_m, lower_freq,
    /// upper_l, upper_m, upper_freq]`.
    pub fn from_slice(extents: &[FT]) -> Result<BeamExtents<FT>, EBeamError> {
        match extents {
            &[ll, lm, lf, ul, um, uf] => Ok(BeamExtents::new([ll, lm, lf], [ul, um, uf])),
            _ => Err(EBeamError::ExtentsCount {
                expected: NUM_BEAM_EXTENTS,
                got: extents.len(),
            }),
        }
    }

    /// The extents in the same order as [`BeamExtents::from_slice`] expects.
    pub fn to_array(&self) -> [FT; NUM_BEAM_EXTENTS] {
        [
            self.lower_l,
            self.lower_m,
            self.lower_freq,
            self.upper_l,
            self.upper_m,
            self.upper_freq,
        ]
    }

    /// Check that every axis spans a non-empty, finite interval.
    pub fn validate(&self) -> Result<(), EBeamError> {
        for (axis, lower, upper) in [
            ("l", self.lower_l, self.upper_l),
            ("m", self.lower_m, self.upper_m),
            ("frequency", self.lower_freq, self.upper_freq),
        ] {
            // Written so that NaNs fail.
            if !(lower.is_finite() && upper.is_finite() && upper > lower) {
                return Err(EBeamError::DegenerateExtent {
                    axis,
                    lower: lower.to_f64().unwrap_or(f64::NAN),
                    upper: upper.to_f64().unwrap_or(f64::NAN),
                });
            }
        }
        Ok(())
    }
}

/// Everything the E-beam kernel reads. All arrays are indexed by *global*
/// channel; only the channels described by the kernel's `nchan` field are
/// used.
#[derive(Debug, Clone)]
pub struct EBeamInputs<'a, FT> {
    /// Source direction cosines, shape (nsrc, 2).
    pub lm: ArrayView2<'a, FT>,

    /// Channel frequencies \[Hz\], shape (nchan).
    pub frequency: ArrayView1<'a, FT>,

    /// Pointing errors added to each rotated direction, shape (ntime, na,
    /// nchan, 2).
    pub point_errors: ArrayView4<'a, FT>,

    /// Scaling applied after the pointing errors, shape (na, nchan, 2).
    pub antenna_scaling: ArrayView3<'a, FT>,

    /// Parallactic angles \[radians\], shape (ntime, na).
    pub parallactic_angles: ArrayView2<'a, FT>,

    pub beam_extents: BeamExtents<FT>,

    /// The beam cube, shape (beam_lw, beam_mh, beam_nud, [`EBEAM_NPOL`]).
    pub e_beam: ArrayView4<'a, Complex<FT>>,
}

impl<FT: EBeamFloat> EBeamInputs<'_, FT> {
    /// Check the shape of every input against the kernel's dimensions.
    fn validate(&self, const_data: &ConstData) -> Result<(), EBeamError> {
        let nsrc = const_data.num_sources();
        let ntime = const_data.num_times();
        let na = const_data.num_antennas();
        let nchan = const_data.nchan.global();
        let (beam_lw, beam_mh, beam_nud) = const_data.beam_dims();

        check_shape("lm", self.lm.shape(), &[nsrc, 2])?;
        check_shape("frequency", self.frequency.shape(), &[nchan])?;
        check_shape(
            "point_errors",
            self.point_errors.shape(),
            &[ntime, na, nchan, 2],
        )?;
        check_shape(
            "antenna_scaling",
            self.antenna_scaling.shape(),
            &[na, nchan, 2],
        )?;
        check_shape(
            "parallactic_angles",
            self.parallactic_angles.shape(),
            &[ntime, na],
        )?;
        check_shape(
            "e_beam",
            self.e_beam.shape(),
            &[beam_lw, beam_mh, beam_nud, EBEAM_NPOL],
        )?;
        self.beam_extents.validate()
    }
}

fn check_shape(name: &'static str, got: &[usize], expected: &[usize]) -> Result<(), EBeamError> {
    if got == expected {
        Ok(())
    } else {
        Err(EBeamError::InputShape {
            name,
            expected: expected.to_vec(),
            got: got.to_vec(),
        })
    }
}

/// The E-beam kernel, specialised for an execution [`Device`] and a float type.
/// The complex type used for the beam and the results is `Complex<FT>`.
///
/// A kernel is created once per set of dimensions ([`ConstData`]) and can be
/// run any number of times with inputs of those dimensions.
#[derive(Debug)]
pub struct RimeEBeam<D: Device = Cpu, FT: EBeamFloat = f64> {
    const_data: ConstData,

    launch_params: LaunchParams,

    _device: PhantomData<fn() -> (D, FT)>,
}

impl<D: Device, FT: EBeamFloat> RimeEBeam<D, FT> {
    /// Create a new [`RimeEBeam`] for the given dimensions. The dimensions are
    /// validated here.
    ///
    /// # Examples
    ///
    /// ```
    /// use rime_ebeam::{ConstData, Cpu, DimField, RimeEBeam};
    ///
    /// let const_data = ConstData::new(10, 4, 7, DimField::new(16), 50, 50, 8);
    /// let ebeam = RimeEBeam::<Cpu, f32>::new(const_data).unwrap();
    /// assert_eq!(ebeam.launch_params().block, [32, 7, 1]);
    ///
    /// let mut bad = const_data;
    /// bad.nsrc = -1;
    /// assert!(RimeEBeam::<Cpu, f64>::new(bad).is_err());
    /// ```
    pub fn new(const_data: ConstData) -> Result<Self, EBeamError> {
        const_data.validate()?;
        let launch_params = LaunchParams::new(&const_data, FT::PRECISION);
        Ok(RimeEBeam {
            const_data,
            launch_params,
            _device: PhantomData,
        })
    }

    pub fn const_data(&self) -> &ConstData {
        &self.const_data
    }

    pub fn launch_params(&self) -> &LaunchParams {
        &self.launch_params
    }

    /// Calculate the E-beam Jones terms for every source, time step, antenna
    /// and local channel. The result has shape (nsrc, ntime, na, npolchan),
    /// where npolchan is the local size of the polarised-channel dimension;
    /// element `[s, t, a, 4 * c + p]` is polarisation `p` of local channel `c`.
    pub fn calc_jones(&self, inputs: &EBeamInputs<FT>) -> Result<Array4<Complex<FT>>, EBeamError> {
        let mut results = Array4::default(self.const_data.jones_shape());
        self.calc_jones_inner(inputs, results.view_mut())?;
        Ok(results)
    }

    /// The same as [`RimeEBeam::calc_jones`], but the Jones terms are written
    /// into pre-allocated memory. `results` must have the shape (nsrc, ntime,
    /// na, npolchan).
    pub fn calc_jones_inner(
        &self,
        inputs: &EBeamInputs<FT>,
        mut results: ArrayViewMut4<Complex<FT>>,
    ) -> Result<(), EBeamError> {
        inputs.validate(&self.const_data)?;
        let (nsrc, ntime, na, npolchan) = self.const_data.jones_shape();
        check_shape("results", results.shape(), &[nsrc, ntime, na, npolchan])?;

        debug!(
            "Running the {} precision E-beam on the {}: {} sources, {} times, {} antennas, {} channels ({}), beam cube {:?}, launch {:?}",
            FT::PRECISION,
            D::NAME,
            nsrc,
            ntime,
            na,
            self.const_data.nchan.local(),
            self.const_data.nchan,
            self.const_data.beam_dims(),
            self.launch_params,
        );

        let srcs_per_block = self.launch_params.block[2];
        D::run_source_blocks(results.view_mut(), srcs_per_block, |i_block, block| {
            self.calc_source_block(inputs, i_block, block)
        });
        Ok(())
    }

    /// The same as [`RimeEBeam::calc_jones`], but each source, time step,
    /// antenna and local channel gets its own Jones matrix. The result has
    /// shape (nsrc, ntime, na, nchan).
    pub fn calc_jones_matrices(
        &self,
        inputs: &EBeamInputs<FT>,
    ) -> Result<Array4<Jones<FT>>, EBeamError> {
        let jones = self.calc_jones(inputs)?;
        let (nsrc, ntime, na, npolchan) = jones.dim();
        Ok(Array4::from_shape_fn(
            (nsrc, ntime, na, npolchan / EBEAM_NPOL),
            |(s, t, a, c)| {
                let p = c * EBEAM_NPOL;
                Jones::from([
                    jones[[s, t, a, p]],
                    jones[[s, t, a, p + 1]],
                    jones[[s, t, a, p + 2]],
                    jones[[s, t, a, p + 3]],
                ])
            },
        ))
    }

    /// Fill a block of sources. The block's antennas and polarised channels
    /// are visited in the tiles given by the launch parameters.
    fn calc_source_block(
        &self,
        inputs: &EBeamInputs<FT>,
        i_block: usize,
        mut results: ArrayViewMut4<Complex<FT>>,
    ) {
        let cd = &self.const_data;
        let lp = &self.launch_params;
        let (nsrc, ntime, na, npolchan) = cd.jones_shape();
        let sources = lp.source_range(i_block, nsrc);
        trace!("E-beam source block {i_block}: sources {sources:?}");

        for (results, src) in results.outer_iter_mut().zip(sources) {
            self.calc_source(inputs, src, ntime, na, npolchan, results);
        }
    }

    fn calc_source(
        &self,
        inputs: &EBeamInputs<FT>,
        src: usize,
        ntime: usize,
        na: usize,
        npolchan: usize,
        mut results: ArrayViewMut3<Complex<FT>>,
    ) {
        let lp = &self.launch_params;
        let chan_offset = self.const_data.nchan.range().start;
        let l0 = inputs.lm[[src, 0]];
        let m0 = inputs.lm[[src, 1]];

        for i_ant_block in 0..lp.grid[1] {
            for ant in lp.antenna_range(i_ant_block, na) {
                for time in 0..ntime {
                    // Figure out how far the source has rotated within the
                    // beam.
                    let (sin_pa, cos_pa) = inputs.parallactic_angles[[time, ant]].sin_cos();
                    let l_rot = l0 * cos_pa - m0 * sin_pa;
                    let m_rot = l0 * sin_pa + m0 * cos_pa;

                    for i_polchan_block in 0..lp.grid[0] {
                        // Blocks along this axis hold whole channels; the
                        // block size is a multiple of EBEAM_NPOL.
                        let polchans = lp.polchan_range(i_polchan_block, npolchan);
                        for chan in polchans.start / EBEAM_NPOL..polchans.end / EBEAM_NPOL {
                            let g_chan = chan + chan_offset;
                            let l = (l_rot + inputs.point_errors[[time, ant, g_chan, 0]])
                                * inputs.antenna_scaling[[ant, g_chan, 0]];
                            let m = (m_rot + inputs.point_errors[[time, ant, g_chan, 1]])
                                * inputs.antenna_scaling[[ant, g_chan, 1]];

                            let pols = sample_beam(
                                inputs.e_beam,
                                &inputs.beam_extents,
                                l,
                                m,
                                inputs.frequency[g_chan],
                            );
                            let start = chan * EBEAM_NPOL;
                            results
                                .slice_mut(s![time, ant, start..start + EBEAM_NPOL])
                                .iter_mut()
                                .zip(pols)
                                .for_each(|(r, p)| *r = p);
                        }
                    }
                }
            }
        }
    }
}
