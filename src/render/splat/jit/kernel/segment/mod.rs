//! Segmenting the sorted pairs into tiles.

pub use super::*;

use burn::tensor::ops::IntTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// `T`
    pub tile_point_count: u32,
    /// `(I_y / T_y) * (I_x / T_x)`
    pub tile_count: u32,
}

#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, I: IntElement> {
    /// `[T]`, sorted.
    pub tile_indices: JitTensor<R, I>,
}

#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, I: IntElement> {
    /// `[(I_y / T_y) * (I_x / T_x), 2]`
    ///
    /// Tiles without points have empty ranges.
    pub tile_point_ranges: JitTensor<R, I>,
}

/// `G`
pub const GROUP_SIZE: u32 = 256;

/// Finding the range of pairs of each tile.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, I>,
) -> Outputs<R, I> {
    impl_kernel_source!(Kernel, "kernel.wgsl");

    // Specifying the parameters

    let client = &inputs.tile_indices.client;
    let device = &inputs.tile_indices.device;

    // [(I_y / T_y) * (I_x / T_x), 2]
    let tile_point_ranges = JitBackend::<R, F, I>::int_zeros(
        [arguments.tile_count as usize, 2].into(),
        device,
    );

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(Kernel, cube_dim_linear(GROUP_SIZE))),
        cube_count_linear(arguments.tile_point_count.div_ceil(GROUP_SIZE)),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            inputs.tile_indices.handle.binding(),
            tile_point_ranges.handle.to_owned().binding(),
        ],
    );

    Outputs { tile_point_ranges }
}
