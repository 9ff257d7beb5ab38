// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::{null, null_mut};

use approx::*;
use num_complex::{Complex32, Complex64};
use rayon::prelude::*;
use serial_test::serial;

use super::*;
use crate::ebeam::tests::EBeamProblem;
use crate::ffi::{ebeam_last_error_length, ebeam_last_error_message};

fn last_error() -> String {
    let length = ebeam_last_error_length();
    assert!(length > 0, "there was no error to get");
    let mut buffer = vec![0 as c_char; length as usize];
    let written = unsafe { ebeam_last_error_message(buffer.as_mut_ptr(), length) };
    assert_eq!(written, length - 1);
    unsafe { CStr::from_ptr(buffer.as_ptr()) }
        .to_str()
        .unwrap()
        .to_string()
}

/// Run the f64 FFI function on a problem, returning the exit code.
fn calc_jones_via_ffi(problem: &EBeamProblem<f64>, jones: &mut Array4<Complex64>) -> i32 {
    let extents = problem.cube.extents.to_array();
    unsafe {
        ebeam_calc_jones(
            &problem.const_data,
            problem.lm.as_ptr(),
            problem.frequency.as_ptr(),
            problem.point_errors.as_ptr(),
            problem.antenna_scaling.as_ptr(),
            problem.parallactic_angles.as_ptr(),
            extents.as_ptr(),
            problem.cube.e_beam.as_ptr().cast(),
            jones.as_mut_ptr().cast(),
        )
    }
}

#[test]
#[serial]
fn test_calc_jones_via_ffi() {
    let problem = EBeamProblem::<f64>::new(5, 3, 4, DimField::new(6));
    let mut jones = Array4::<Complex64>::zeros(problem.const_data.jones_shape());
    let result = calc_jones_via_ffi(&problem, &mut jones);
    assert_eq!(result, 0);

    let expected = RimeEBeam::<Cpu, f64>::new(problem.const_data)
        .unwrap()
        .calc_jones(&problem.inputs())
        .unwrap();
    assert_abs_diff_eq!(jones, expected);
}

#[test]
#[serial]
fn test_calc_jones_via_ffi_channel_slice() {
    let problem = EBeamProblem::<f64>::new(2, 2, 3, DimField::slice(8, 3, 6));
    let mut jones = Array4::<Complex64>::zeros(problem.const_data.jones_shape());
    assert_eq!(jones.dim(), (2, 2, 3, 12));
    let result = calc_jones_via_ffi(&problem, &mut jones);
    assert_eq!(result, 0);

    let expected = RimeEBeam::<Cpu, f64>::new(problem.const_data)
        .unwrap()
        .calc_jones(&problem.inputs())
        .unwrap();
    assert_abs_diff_eq!(jones, expected);
}

#[test]
#[serial]
fn test_calc_jones_f32_via_ffi() {
    let problem = EBeamProblem::<f32>::new(3, 2, 2, DimField::new(4));
    let extents = problem.cube.extents.to_array();
    let mut jones = Array4::<Complex32>::zeros(problem.const_data.jones_shape());
    let result = unsafe {
        ebeam_calc_jones_f32(
            &problem.const_data,
            problem.lm.as_ptr(),
            problem.frequency.as_ptr(),
            problem.point_errors.as_ptr(),
            problem.antenna_scaling.as_ptr(),
            problem.parallactic_angles.as_ptr(),
            extents.as_ptr(),
            problem.cube.e_beam.as_ptr().cast(),
            jones.as_mut_ptr().cast(),
        )
    };
    assert_eq!(result, 0);

    let expected = RimeEBeam::<Cpu, f32>::new(problem.const_data)
        .unwrap()
        .calc_jones(&problem.inputs())
        .unwrap();
    assert_abs_diff_eq!(jones, expected);
}

#[test]
#[serial]
fn test_bad_const_data_via_ffi() {
    let mut problem = EBeamProblem::<f64>::new(2, 2, 2, DimField::new(2));
    let mut jones = Array4::<Complex64>::zeros(problem.const_data.jones_shape());
    problem.const_data.na = -2;
    let result = calc_jones_via_ffi(&problem, &mut jones);
    assert_eq!(result, 1);
    let error = last_error();
    assert!(error.contains("na"), "{error}");
    // Nothing was written.
    assert!(jones.iter().all(|j| *j == Complex64::default()));
}

#[test]
#[serial]
fn test_bad_extents_via_ffi() {
    let mut problem = EBeamProblem::<f64>::new(2, 2, 2, DimField::new(2));
    problem.cube.extents.upper_freq = problem.cube.extents.lower_freq;
    let mut jones = Array4::<Complex64>::zeros(problem.const_data.jones_shape());
    let result = calc_jones_via_ffi(&problem, &mut jones);
    assert_eq!(result, 1);
    let error = last_error();
    assert!(error.contains("frequency"), "{error}");
}

#[test]
#[serial]
fn test_null_pointer_via_ffi() {
    let problem = EBeamProblem::<f64>::new(1, 1, 1, DimField::new(1));
    let extents = problem.cube.extents.to_array();
    let result = unsafe {
        ebeam_calc_jones(
            &problem.const_data,
            problem.lm.as_ptr(),
            null(),
            problem.point_errors.as_ptr(),
            problem.antenna_scaling.as_ptr(),
            problem.parallactic_angles.as_ptr(),
            extents.as_ptr(),
            problem.cube.e_beam.as_ptr().cast(),
            null_mut(),
        )
    };
    assert_eq!(result, 1);
    assert_eq!(last_error(), "frequency was a null pointer");
}

#[test]
#[serial]
fn test_const_data_via_ffi() {
    let const_data = ebeam_const_data_new(10, 2, 7, 16, 4, 12, 20, 20, 4);
    assert_eq!(const_data.npolchan, DimField::slice(64, 16, 48));
    assert_eq!(unsafe { ebeam_const_data_validate(&const_data) }, 0);

    let bad = ebeam_const_data_new(10, 2, 7, 16, 12, 4, 20, 20, 4);
    assert_eq!(unsafe { ebeam_const_data_validate(&bad) }, 1);
    assert!(last_error().contains("nchan"));

    let empty_beam = ebeam_const_data_new(10, 2, 7, 16, 0, 16, 20, 0, 4);
    assert_eq!(unsafe { ebeam_const_data_validate(&empty_beam) }, 1);
    assert!(last_error().contains("beam_mh"));

    assert_eq!(unsafe { ebeam_const_data_validate(null()) }, 1);
    assert_eq!(last_error(), "const_data was a null pointer");
}

#[test]
#[serial]
fn test_huge_channel_count_via_ffi() {
    // 4 * 2^30 polarised channels can't be represented.
    let const_data = ebeam_const_data_new(1, 1, 1, 1 << 30, 0, 1 << 30, 2, 2, 2);
    assert_eq!(unsafe { ebeam_const_data_validate(&const_data) }, 1);
    assert!(last_error().contains("npolchan"));

    // Validation happens before any of the (far too small) arrays are read.
    let problem = EBeamProblem::<f64>::new(1, 1, 1, DimField::new(1));
    let extents = problem.cube.extents.to_array();
    let mut jones = Array4::<Complex64>::zeros(problem.const_data.jones_shape());
    let result = unsafe {
        ebeam_calc_jones(
            &const_data,
            problem.lm.as_ptr(),
            problem.frequency.as_ptr(),
            problem.point_errors.as_ptr(),
            problem.antenna_scaling.as_ptr(),
            problem.parallactic_angles.as_ptr(),
            extents.as_ptr(),
            problem.cube.e_beam.as_ptr().cast(),
            jones.as_mut_ptr().cast(),
        )
    };
    assert_eq!(result, 1);
    assert!(last_error().contains("npolchan"));
}

#[test]
#[serial]
fn test_exit_codes() {
    assert_eq!(catch_panics(|| Ok(())), 0);
    assert_eq!(ebeam_last_error_length(), 0);

    let code = catch_panics(|| {
        Err(EBeamError::ExtentsCount {
            expected: 6,
            got: 2,
        })
    });
    assert_eq!(code, 1);
    assert_eq!(last_error(), "Expected 6 beam extents, but got 2");
}

#[test]
#[serial]
fn test_panics_are_caught() {
    let code = catch_panics(|| panic!("the kernel fell over"));
    assert_eq!(code, -1);
    assert_eq!(last_error(), "the kernel fell over");

    // A panic on a worker thread is reported on the calling thread.
    let code = catch_panics(|| {
        (0..8_usize).into_par_iter().for_each(|i| {
            if i == 5 {
                panic!("block {i} fell over");
            }
        });
        Ok(())
    });
    assert_eq!(code, -1);
    assert_eq!(last_error(), "block 5 fell over");
    assert_eq!(ebeam_last_error_length(), 0);
}
