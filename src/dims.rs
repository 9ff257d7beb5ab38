// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dimensional constants passed into the E-beam kernel.
//!
//! Both structs are `#[repr(C)]`; they are the same aggregates C callers fill
//! in before calling into the library.

use std::ops::Range;

use crate::{constants::EBEAM_NPOL, ebeam::EBeamError};

/// A contiguous slice `[lower_extent, upper_extent)` of a global axis with
/// `global_size` elements.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DimField {
    pub global_size: i32,
    pub local_size: i32,
    pub lower_extent: i32,
    pub upper_extent: i32,
}

impl DimField {
    /// A [`DimField`] covering the whole axis.
    pub fn new(global_size: i32) -> DimField {
        DimField {
            global_size,
            local_size: global_size,
            lower_extent: 0,
            upper_extent: global_size,
        }
    }

    /// A [`DimField`] covering `[lower_extent, upper_extent)` of the axis.
    pub fn slice(global_size: i32, lower_extent: i32, upper_extent: i32) -> DimField {
        DimField {
            global_size,
            // Nonsense extents may not be representable; validation catches
            // them.
            local_size: upper_extent.wrapping_sub(lower_extent),
            lower_extent,
            upper_extent,
        }
    }

    /// Multiply every member by `factor`. This turns a channel field into a
    /// polarised-channel field. `None` is returned if any member overflows.
    pub fn scaled(self, factor: i32) -> Option<DimField> {
        Some(DimField {
            global_size: self.global_size.checked_mul(factor)?,
            local_size: self.local_size.checked_mul(factor)?,
            lower_extent: self.lower_extent.checked_mul(factor)?,
            upper_extent: self.upper_extent.checked_mul(factor)?,
        })
    }

    /// Check that the members describe a valid slice of the global axis.
    pub fn validate(&self, name: &'static str) -> Result<(), EBeamError> {
        let ok = self.global_size >= 0
            && self.lower_extent >= 0
            && self.lower_extent <= self.upper_extent
            && self.upper_extent <= self.global_size
            && self.local_size == self.upper_extent - self.lower_extent;
        if ok {
            Ok(())
        } else {
            Err(EBeamError::InconsistentDimField {
                name,
                global_size: self.global_size,
                local_size: self.local_size,
                lower_extent: self.lower_extent,
                upper_extent: self.upper_extent,
            })
        }
    }

    pub fn global(&self) -> usize {
        self.global_size as usize
    }

    pub fn local(&self) -> usize {
        self.local_size as usize
    }

    /// The global indices covered by this field.
    pub fn range(&self) -> Range<usize> {
        self.lower_extent as usize..self.upper_extent as usize
    }
}

impl std::fmt::Display for DimField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}..{}) of {}",
            self.local_size, self.lower_extent, self.upper_extent, self.global_size
        )
    }
}

/// The problem dimensions of a single E-beam kernel invocation.
///
/// This holds no behaviour other than validation; it is created by the caller
/// once per invocation and is never mutated by the kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstData {
    /// The number of sources.
    pub nsrc: i32,
    /// The number of time steps.
    pub ntime: i32,
    /// The number of antennas.
    pub na: i32,
    /// The channel dimension.
    pub nchan: DimField,
    /// The polarisation x channel dimension; always `nchan` scaled by
    /// [`EBEAM_NPOL`].
    pub npolchan: DimField,
    /// Beam cube size along l.
    pub beam_lw: i32,
    /// Beam cube size along m.
    pub beam_mh: i32,
    /// Beam cube size along frequency.
    pub beam_nud: i32,
}

impl ConstData {
    /// Create a new [`ConstData`]. `npolchan` is derived from `nchan`; if it
    /// can't be represented, it is left zeroed and [`ConstData::validate`]
    /// reports the problem.
    pub fn new(
        nsrc: i32,
        ntime: i32,
        na: i32,
        nchan: DimField,
        beam_lw: i32,
        beam_mh: i32,
        beam_nud: i32,
    ) -> ConstData {
        ConstData {
            nsrc,
            ntime,
            na,
            nchan,
            npolchan: nchan.scaled(EBEAM_NPOL as i32).unwrap_or_default(),
            beam_lw,
            beam_mh,
            beam_nud,
        }
    }

    /// Check all of the invariants of the dimensions. The accessor methods
    /// below are only meaningful if this returns `Ok`.
    pub fn validate(&self) -> Result<(), EBeamError> {
        for (name, value) in [
            ("nsrc", self.nsrc),
            ("ntime", self.ntime),
            ("na", self.na),
            ("beam_lw", self.beam_lw),
            ("beam_mh", self.beam_mh),
            ("beam_nud", self.beam_nud),
        ] {
            if value < 0 {
                return Err(EBeamError::NegativeDimension { name, value });
            }
        }
        for (name, value) in [
            ("beam_lw", self.beam_lw),
            ("beam_mh", self.beam_mh),
            ("beam_nud", self.beam_nud),
        ] {
            if value == 0 {
                return Err(EBeamError::EmptyBeamDimension { name });
            }
        }
        self.nchan.validate("nchan")?;
        self.npolchan.validate("npolchan")?;

        let expected = self.nchan.scaled(EBEAM_NPOL as i32).ok_or_else(|| {
            EBeamError::PolChanOverflow {
                npol: EBEAM_NPOL,
                nchan: self.nchan.to_string(),
            }
        })?;
        if self.npolchan != expected {
            return Err(EBeamError::PolChanMismatch {
                npol: EBEAM_NPOL,
                expected: expected.to_string(),
                got: self.npolchan.to_string(),
            });
        }

        // Every array the kernel touches must be addressable.
        let (nsrc, ntime, na, npolchan) = self.jones_shape();
        let nchan = self.nchan.global();
        let (beam_lw, beam_mh, beam_nud) = self.beam_dims();
        num_elements("jones", &[nsrc, ntime, na, npolchan, 2])?;
        num_elements("point_errors", &[ntime, na, nchan, 2])?;
        num_elements("antenna_scaling", &[na, nchan, 2])?;
        num_elements("e_beam", &[beam_lw, beam_mh, beam_nud, EBEAM_NPOL, 2])?;

        Ok(())
    }

    pub fn num_sources(&self) -> usize {
        self.nsrc as usize
    }

    pub fn num_times(&self) -> usize {
        self.ntime as usize
    }

    pub fn num_antennas(&self) -> usize {
        self.na as usize
    }

    /// The beam cube dimensions (l, m, frequency).
    pub fn beam_dims(&self) -> (usize, usize, usize) {
        (
            self.beam_lw as usize,
            self.beam_mh as usize,
            self.beam_nud as usize,
        )
    }

    /// The shape of the kernel's output: (sources, times, antennas, local
    /// polarised channels).
    pub fn jones_shape(&self) -> (usize, usize, usize, usize) {
        (
            self.num_sources(),
            self.num_times(),
            self.num_antennas(),
            self.npolchan.local(),
        )
    }
}

/// The number of elements in an array of the given shape, if that many
/// elements could be allocated.
pub(crate) fn num_elements(name: &'static str, shape: &[usize]) -> Result<usize, EBeamError> {
    shape
        .iter()
        .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(|| EBeamError::TooManyElements {
            name,
            shape: shape.to_vec(),
        })
}
