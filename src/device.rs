// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Execution devices for the E-beam kernel.
//!
//! The kernel splits its output along the source axis into blocks (see
//! [`LaunchParams`](crate::LaunchParams)); a device decides how those blocks
//! are run. Blocks write to disjoint parts of the output, so they can be run in
//! any order.

use ndarray::{ArrayViewMut4, Axis};
use rayon::prelude::*;

/// Something that can run the kernel's source blocks.
pub trait Device: Send + Sync + 'static {
    /// A human-readable name for logging.
    const NAME: &'static str;

    /// Split `results` along its first axis into chunks of `srcs_per_block`
    /// and call `f` on each chunk with the chunk's block index.
    /// `srcs_per_block` must be non-zero.
    fn run_source_blocks<T, F>(results: ArrayViewMut4<T>, srcs_per_block: usize, f: F)
    where
        T: Send + Sync,
        F: Fn(usize, ArrayViewMut4<T>) + Send + Sync;
}

/// Run blocks in parallel on the CPU with rayon. The number of threads used
/// can be controlled by setting `RAYON_NUM_THREADS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu;

impl Device for Cpu {
    const NAME: &'static str = "CPU";

    fn run_source_blocks<T, F>(mut results: ArrayViewMut4<T>, srcs_per_block: usize, f: F)
    where
        T: Send + Sync,
        F: Fn(usize, ArrayViewMut4<T>) + Send + Sync,
    {
        results
            .axis_chunks_iter_mut(Axis(0), srcs_per_block)
            .into_par_iter()
            .enumerate()
            .for_each(|(i_block, block)| f(i_block, block));
    }
}

/// Run blocks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl Device for Serial {
    const NAME: &'static str = "serial CPU";

    fn run_source_blocks<T, F>(mut results: ArrayViewMut4<T>, srcs_per_block: usize, f: F)
    where
        T: Send + Sync,
        F: Fn(usize, ArrayViewMut4<T>) + Send + Sync,
    {
        results
            .axis_chunks_iter_mut(Axis(0), srcs_per_block)
            .enumerate()
            .for_each(|(i_block, block)| f(i_block, block));
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    fn fill_with_block_index<D: Device>() -> Array4<usize> {
        let mut a = Array4::zeros((5, 2, 1, 1));
        D::run_source_blocks(a.view_mut(), 2, |i_block, mut block| {
            block.fill(i_block + 1);
        });
        a
    }

    #[test]
    fn devices_visit_every_block_once() {
        let serial = fill_with_block_index::<Serial>();
        let cpu = fill_with_block_index::<Cpu>();
        assert_eq!(serial, cpu);
        let firsts: Vec<usize> = serial.outer_iter().map(|s| s[[0, 0, 0]]).collect();
        assert_eq!(firsts, vec![1, 1, 2, 2, 3]);
    }
}
