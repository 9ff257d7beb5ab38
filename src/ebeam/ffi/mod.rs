// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code for allowing other languages to talk to this Rust library's E-beam
//! code.
//!
//! We can't pass complex numbers across the FFI boundary, so the real and
//! imaginary components of the beam cube and the results are interleaved
//! floats. Arrays are C-ordered with the shapes documented on
//! [`EBeamInputs`](super::EBeamInputs).

#[cfg(test)]
mod tests;

use std::{panic, slice};

use log::debug;
use ndarray::prelude::*;
use num_complex::Complex;

use super::{BeamExtents, EBeamError, EBeamInputs, RimeEBeam};
use crate::{
    constants::{EBEAM_NPOL, NUM_BEAM_EXTENTS},
    device::Cpu,
    dims::{num_elements, ConstData, DimField},
    ffi::{ffi_error, update_last_error},
    types::EBeamFloat,
};

/// Fill in a `ConstData` struct. `npolchan` is derived from the channel
/// arguments. The struct is not validated; see `ebeam_const_data_validate`.
///
/// # Arguments
///
/// * `nsrc` - The number of sources
/// * `ntime` - The number of time steps
/// * `na` - The number of antennas
/// * `nchan` - The total number of channels
/// * `chan_lower` - The first channel to be computed
/// * `chan_upper` - One past the last channel to be computed
/// * `beam_lw` - The beam cube size along l
/// * `beam_mh` - The beam cube size along m
/// * `beam_nud` - The beam cube size along frequency
///
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn ebeam_const_data_new(
    nsrc: i32,
    ntime: i32,
    na: i32,
    nchan: i32,
    chan_lower: i32,
    chan_upper: i32,
    beam_lw: i32,
    beam_mh: i32,
    beam_nud: i32,
) -> ConstData {
    ConstData::new(
        nsrc,
        ntime,
        na,
        DimField::slice(nchan, chan_lower, chan_upper),
        beam_lw,
        beam_mh,
        beam_nud,
    )
}

/// Check a `ConstData` struct.
///
/// # Returns
///
/// * An exit code integer. If this is non-zero then an error occurred; the
///   details can be obtained by (1) getting the length of the error string by
///   calling `ebeam_last_error_length` and (2) calling
///   `ebeam_last_error_message` with a string buffer with a length at least
///   equal to the error length.
///
/// # Safety
///
/// `const_data` must be null or point to a `ConstData`.
#[no_mangle]
pub unsafe extern "C" fn ebeam_const_data_validate(const_data: *const ConstData) -> i32 {
    let const_data = match const_data.as_ref() {
        Some(c) => c,
        None => {
            update_last_error("const_data was a null pointer".to_string());
            return 1;
        }
    };
    ffi_error!(const_data.validate());
    0
}

/// Calculate E-beam Jones terms in double precision. The work is done in
/// parallel; the number of threads can be controlled by setting
/// `RAYON_NUM_THREADS`.
///
/// # Arguments
///
/// * `const_data` - The problem dimensions
/// * `lm` - Source direction cosines, `nsrc * 2` doubles
/// * `frequency` - Channel frequencies \[Hz\], `nchan` doubles (all channels,
///   not just the ones being computed)
/// * `point_errors` - Pointing errors, `ntime * na * nchan * 2` doubles
/// * `antenna_scaling` - Antenna scaling, `na * nchan * 2` doubles
/// * `parallactic_angles` - Parallactic angles \[radians\], `ntime * na`
///   doubles
/// * `beam_extents` - 6 doubles: lower l, lower m, lower frequency, upper l,
///   upper m, upper frequency
/// * `e_beam` - The beam cube, `beam_lw * beam_mh * beam_nud * 4` complex
///   values as pairs of doubles
/// * `jones` - A buffer with at least `nsrc * ntime * na * npolchan * 2`
///   doubles allocated (npolchan is the local size); the results are written
///   here as pairs of doubles
///
/// # Returns
///
/// * An exit code integer. If this is non-zero then an error occurred; the
///   details can be obtained by (1) getting the length of the error string by
///   calling `ebeam_last_error_length` and (2) calling
///   `ebeam_last_error_message` with a string buffer with a length at least
///   equal to the error length.
///
/// # Safety
///
/// Every pointer must be valid for the number of elements described above.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ebeam_calc_jones(
    const_data: *const ConstData,
    lm: *const f64,
    frequency: *const f64,
    point_errors: *const f64,
    antenna_scaling: *const f64,
    parallactic_angles: *const f64,
    beam_extents: *const f64,
    e_beam: *const f64,
    jones: *mut f64,
) -> i32 {
    calc_jones_ffi(
        const_data,
        lm,
        frequency,
        point_errors,
        antenna_scaling,
        parallactic_angles,
        beam_extents,
        e_beam,
        jones,
    )
}

/// The same as `ebeam_calc_jones`, but all floats are single precision.
///
/// # Safety
///
/// Every pointer must be valid for the number of elements described in
/// `ebeam_calc_jones`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ebeam_calc_jones_f32(
    const_data: *const ConstData,
    lm: *const f32,
    frequency: *const f32,
    point_errors: *const f32,
    antenna_scaling: *const f32,
    parallactic_angles: *const f32,
    beam_extents: *const f32,
    e_beam: *const f32,
    jones: *mut f32,
) -> i32 {
    calc_jones_ffi(
        const_data,
        lm,
        frequency,
        point_errors,
        antenna_scaling,
        parallactic_angles,
        beam_extents,
        e_beam,
        jones,
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn calc_jones_ffi<FT: EBeamFloat>(
    const_data: *const ConstData,
    lm: *const FT,
    frequency: *const FT,
    point_errors: *const FT,
    antenna_scaling: *const FT,
    parallactic_angles: *const FT,
    beam_extents: *const FT,
    e_beam: *const FT,
    jones: *mut FT,
) -> i32 {
    for (name, null) in [
        ("const_data", const_data.is_null()),
        ("lm", lm.is_null()),
        ("frequency", frequency.is_null()),
        ("point_errors", point_errors.is_null()),
        ("antenna_scaling", antenna_scaling.is_null()),
        ("parallactic_angles", parallactic_angles.is_null()),
        ("beam_extents", beam_extents.is_null()),
        ("e_beam", e_beam.is_null()),
        ("jones", jones.is_null()),
    ] {
        if null {
            update_last_error(format!("{name} was a null pointer"));
            return 1;
        }
    }

    // Validate before using the dimensions to make slices; this also checks
    // that the arrays' element counts are representable.
    let const_data = *const_data;
    let ebeam = ffi_error!(RimeEBeam::<Cpu, FT>::new(const_data));
    let nsrc = const_data.num_sources();
    let ntime = const_data.num_times();
    let na = const_data.num_antennas();
    let nchan = const_data.nchan.global();
    let (beam_lw, beam_mh, beam_nud) = const_data.beam_dims();
    let (_, _, _, npolchan) = const_data.jones_shape();

    let beam_extents = ffi_error!(BeamExtents::from_slice(slice::from_raw_parts(
        beam_extents,
        NUM_BEAM_EXTENTS
    )));
    // num_complex::Complex is repr(C), so pairs of floats can be viewed as
    // complex numbers.
    let e_beam_shape = [beam_lw, beam_mh, beam_nud, EBEAM_NPOL];
    let e_beam = ffi_error!(ArrayView4::from_shape(
        e_beam_shape,
        slice::from_raw_parts(
            e_beam.cast::<Complex<FT>>(),
            ffi_error!(num_elements("e_beam", &e_beam_shape)),
        ),
    ));
    let point_errors_shape = [ntime, na, nchan, 2];
    let antenna_scaling_shape = [na, nchan, 2];
    let inputs = EBeamInputs {
        lm: ffi_error!(ArrayView2::from_shape(
            (nsrc, 2),
            slice::from_raw_parts(lm, ffi_error!(num_elements("lm", &[nsrc, 2]))),
        )),
        frequency: ArrayView1::from(slice::from_raw_parts(frequency, nchan)),
        point_errors: ffi_error!(ArrayView4::from_shape(
            point_errors_shape,
            slice::from_raw_parts(
                point_errors,
                ffi_error!(num_elements("point_errors", &point_errors_shape)),
            ),
        )),
        antenna_scaling: ffi_error!(ArrayView3::from_shape(
            antenna_scaling_shape,
            slice::from_raw_parts(
                antenna_scaling,
                ffi_error!(num_elements("antenna_scaling", &antenna_scaling_shape)),
            ),
        )),
        parallactic_angles: ffi_error!(ArrayView2::from_shape(
            (ntime, na),
            slice::from_raw_parts(
                parallactic_angles,
                ffi_error!(num_elements("parallactic_angles", &[ntime, na])),
            ),
        )),
        beam_extents,
        e_beam,
    };
    let jones_shape = [nsrc, ntime, na, npolchan];
    let results = ffi_error!(ArrayViewMut4::from_shape(
        jones_shape,
        slice::from_raw_parts_mut(
            jones.cast::<Complex<FT>>(),
            ffi_error!(num_elements("jones", &jones_shape)),
        ),
    ));

    catch_panics(|| ebeam.calc_jones_inner(&inputs, results))
}

/// Run `f`, converting its result into an FFI exit code: 0 for success, 1 for
/// an error and -1 for a panic. Errors and panic messages are stored as the
/// last error.
fn catch_panics<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), EBeamError>,
{
    // Panics may happen on rayon worker threads, which have their own last
    // error, so the message is taken from the payload that reaches this
    // thread. The hook only stops the panic from being printed.
    panic::set_hook(Box::new(|pi| {
        debug!("E-beam panic: {}", panic_message::panic_info_message(pi));
    }));

    let result = panic::catch_unwind(panic::AssertUnwindSafe(f));

    let _ = panic::take_hook();

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            update_last_error(e.to_string());
            1
        }
        Err(payload) => {
            update_last_error(panic_message::panic_message(&payload).to_string());
            -1
        }
    }
}
