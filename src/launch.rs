// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! How the E-beam work is split into blocks.
//!
//! A block is a tile of (polarised channels, antennas, sources); it covers all
//! time steps. The grid is the number of blocks along each of those axes.

use std::ops::Range;

use crate::{dims::ConstData, types::Precision};

/// Block and grid dimensions for an E-beam invocation. Index 0 is polarised
/// channels, 1 is antennas and 2 is sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchParams {
    pub block: [usize; 3],
    pub grid: [usize; 3],
}

impl LaunchParams {
    /// Determine the launch parameters for the given dimensions. The default
    /// block dimensions depend on the precision, and are shrunk for problem
    /// sizes smaller than a block.
    pub fn new(const_data: &ConstData, precision: Precision) -> LaunchParams {
        let sizes = [
            const_data.npolchan.local(),
            const_data.num_antennas(),
            const_data.num_sources(),
        ];
        let mut block = precision.default_block_dims();
        for (b, &size) in block.iter_mut().zip(sizes.iter()) {
            if size < *b {
                // Blocks can't be empty, even if the problem is.
                *b = size.max(1);
            }
        }
        let grid = [
            blocks_required(sizes[0], block[0]),
            blocks_required(sizes[1], block[1]),
            blocks_required(sizes[2], block[2]),
        ];
        LaunchParams { block, grid }
    }

    /// The total number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.grid.iter().product()
    }

    /// The source indices covered by the `i`th block along the source axis.
    pub(crate) fn source_range(&self, i: usize, nsrc: usize) -> Range<usize> {
        block_range(i, self.block[2], nsrc)
    }

    /// The antenna indices covered by the `i`th block along the antenna axis.
    pub(crate) fn antenna_range(&self, i: usize, na: usize) -> Range<usize> {
        block_range(i, self.block[1], na)
    }

    /// The local polarised-channel indices covered by the `i`th block along
    /// the polarised channel axis.
    pub(crate) fn polchan_range(&self, i: usize, npolchan: usize) -> Range<usize> {
        block_range(i, self.block[0], npolchan)
    }
}

/// The number of blocks of size `per_block` needed to cover `n` elements.
pub fn blocks_required(n: usize, per_block: usize) -> usize {
    n.div_ceil(per_block)
}

fn block_range(i: usize, per_block: usize, n: usize) -> Range<usize> {
    let start = (i * per_block).min(n);
    let end = (start + per_block).min(n);
    start..end
}
