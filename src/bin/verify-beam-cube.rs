// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! This program reads each given HDF5 beam cube, reports its dimensions and
//! extents, and samples the centre of the cube at every frequency plane to
//! verify the file's data. Set `RUST_LOG=debug` for more output.

use rime_ebeam::{BeamCube, InitBeamCubeError};

fn main() {
    env_logger::init();

    // Test each input file.
    for beam_file in std::env::args().skip(1) {
        // If this threw an error, it was during initialisation.
        if let Err(e) = test_file(&beam_file) {
            println!("File '{}' failed to create a BeamCube: {}", &beam_file, e);
        }
    }
}

fn test_file(beam_file: &str) -> Result<(), InitBeamCubeError> {
    println!("Testing file '{}'", beam_file);
    let cube = BeamCube::<f64>::new(beam_file)?;
    let (beam_lw, beam_mh, beam_nud) = cube.dims();
    let ext = &cube.extents;
    println!("Cube dimensions (l, m, freq): ({beam_lw}, {beam_mh}, {beam_nud})");
    println!(
        "Extents: l [{}, {}], m [{}, {}], freq [{}, {}] Hz",
        ext.lower_l, ext.upper_l, ext.lower_m, ext.upper_m, ext.lower_freq, ext.upper_freq
    );

    let l = 0.5 * (ext.lower_l + ext.upper_l);
    let m = 0.5 * (ext.lower_m + ext.upper_m);
    for i_freq in 0..beam_nud {
        let freq = if beam_nud > 1 {
            ext.lower_freq
                + (ext.upper_freq - ext.lower_freq) * i_freq as f64 / (beam_nud - 1) as f64
        } else {
            ext.lower_freq
        };
        let sample = cube.sample(l, m, freq);
        println!("Freq {freq} Hz: {sample:?}");
        if sample.iter().any(|s| !s.re.is_finite() || !s.im.is_finite()) {
            println!("File '{}' has non-finite values near {freq} Hz", beam_file);
            return Ok(());
        }
    }

    println!("File '{}' is all good!", beam_file);
    Ok(())
}
