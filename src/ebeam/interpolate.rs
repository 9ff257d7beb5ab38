// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sampling the beam cube.

use ndarray::ArrayView4;
use num_complex::Complex;
use num_traits::Zero;

use super::BeamExtents;
use crate::{constants::EBEAM_NPOL, types::EBeamFloat};

/// Sample the beam cube at the direction (`l`, `m`) and frequency `freq_hz`.
///
/// `e_beam` has the shape (l, m, frequency, [`EBEAM_NPOL`]). The direction and
/// frequency are mapped onto the cube's grid with `extents`; the cube's first
/// and last samples along each axis sit exactly on the lower and upper
/// extents. Each polarisation is trilinearly interpolated from the 8
/// surrounding samples; samples outside the cube contribute nothing, so
/// directions far outside the cube give zeros.
///
/// An axis with a single sample is constant between its extents and zero
/// outside them.
///
/// The magnitude and phase are interpolated separately: the result has the
/// weighted mean of the samples' magnitudes, and the phase of the weighted sum
/// of the samples.
///
/// # Examples
///
/// ```
/// use ndarray::Array4;
/// use num_complex::Complex64;
/// use rime_ebeam::{sample_beam, BeamExtents};
///
/// let e_beam = Array4::from_elem((3, 3, 2, 4), Complex64::new(0.0, 2.0));
/// let extents = BeamExtents::new([-1.0, -1.0, 100e6], [1.0, 1.0, 200e6]);
/// let sample = sample_beam(e_beam.view(), &extents, 0.3, -0.2, 150e6);
/// assert!((sample[0] - Complex64::new(0.0, 2.0)).norm() < 1e-12);
/// ```
pub fn sample_beam<FT: EBeamFloat>(
    e_beam: ArrayView4<Complex<FT>>,
    extents: &BeamExtents<FT>,
    l: FT,
    m: FT,
    freq_hz: FT,
) -> [Complex<FT>; EBEAM_NPOL] {
    let (beam_lw, beam_mh, beam_nud, _) = e_beam.dim();
    let (Some(gl), Some(gm), Some(gf)) = (
        grid_coord(l, extents.lower_l, extents.upper_l, beam_lw),
        grid_coord(m, extents.lower_m, extents.upper_m, beam_mh),
        grid_coord(freq_hz, extents.lower_freq, extents.upper_freq, beam_nud),
    ) else {
        return [Complex::zero(); EBEAM_NPOL];
    };
    interpolate(e_beam, gl, gm, gf)
}

/// Map a value onto a grid of `n` samples spanning `[lower, upper]`. A
/// single-sample grid only covers values between the extents; `None` is
/// returned for anything else.
fn grid_coord<FT: EBeamFloat>(value: FT, lower: FT, upper: FT, n: usize) -> Option<FT> {
    if n > 1 {
        Some(FT::from_usize(n - 1) * (value - lower) / (upper - lower))
    } else if lower <= value && value <= upper {
        Some(FT::zero())
    } else {
        None
    }
}

/// Trilinearly interpolate the cube at fractional grid coordinates.
pub(super) fn interpolate<FT: EBeamFloat>(
    e_beam: ArrayView4<Complex<FT>>,
    gl: FT,
    gm: FT,
    gf: FT,
) -> [Complex<FT>; EBEAM_NPOL] {
    let (beam_lw, beam_mh, beam_nud, _) = e_beam.dim();
    let mut sum = [Complex::zero(); EBEAM_NPOL];
    let mut abs_sum = [FT::zero(); EBEAM_NPOL];

    // NaNs and infinities land nowhere in the cube.
    let (Some(l0), Some(m0), Some(f0)) = (
        gl.floor().to_isize(),
        gm.floor().to_isize(),
        gf.floor().to_isize(),
    ) else {
        return sum;
    };

    for l in corners(l0, beam_lw) {
        let wl = weight(l, gl);
        for m in corners(m0, beam_mh) {
            let wm = weight(m, gm);
            for f in corners(f0, beam_nud) {
                let w = wl * wm * weight(f, gf);
                let samples = e_beam.slice(ndarray::s![l, m, f, ..]);
                for ((s, a), &sample) in sum.iter_mut().zip(abs_sum.iter_mut()).zip(samples) {
                    *s = *s + sample * w;
                    *a = *a + sample.norm() * w;
                }
            }
        }
    }

    let mut result = [Complex::zero(); EBEAM_NPOL];
    for ((r, s), &a) in result.iter_mut().zip(sum).zip(abs_sum.iter()) {
        *r = Complex::from_polar(a, s.arg());
    }
    result
}

/// The (up to 2) grid indices either side of a floored coordinate that are
/// inside an axis of length `n`.
fn corners(floor: isize, n: usize) -> impl Iterator<Item = usize> {
    (floor..floor.saturating_add(2))
        .filter_map(move |i| usize::try_from(i).ok().filter(|&i| i < n))
}

fn weight<FT: EBeamFloat>(index: usize, coord: FT) -> FT {
    FT::one() - (FT::from_usize(index) - coord).abs()
}
