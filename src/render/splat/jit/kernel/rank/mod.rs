//! Ranking the points by tile.

pub use super::*;

use burn::tensor::ops::IntTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

/// Arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// `P`
    pub point_count: u32,
    /// `I_x / T_x`
    pub tile_count_x: u32,
}

/// Inputs.
#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, I: IntElement> {
    /// `[P, 4]`
    pub tile_bounds: JitTensor<R, I>,
    /// `[P]`
    pub tile_touched_offsets: JitTensor<R, I>,
}

/// Outputs.
#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, I: IntElement> {
    /// `[T]`
    pub slots: JitTensor<R, I>,
    /// `[T]`
    pub tile_indices: JitTensor<R, I>,
}

/// Group size.
pub const GROUP_SIZE: u32 = 256;

/// Emitting one pair of tile index and slot for each tile touched by each slot.
///
/// `tile_point_count` is `T`, the total of touched counts.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, I>,
    tile_point_count: u32,
) -> Outputs<R, I> {
    impl_kernel_source!(Kernel, "kernel.wgsl");

    // Specifying the parameters

    let client = &inputs.tile_bounds.client;
    let device = &inputs.tile_bounds.device;
    // T
    let tile_point_count = (tile_point_count as usize).max(1);

    // [T]
    let slots = JitBackend::<R, F, I>::int_empty([tile_point_count].into(), device);
    // [T]
    let tile_indices =
        JitBackend::<R, F, I>::int_empty([tile_point_count].into(), device);

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(Kernel, cube_dim_linear(GROUP_SIZE))),
        cube_count_linear(arguments.point_count.div_ceil(GROUP_SIZE)),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            inputs.tile_bounds.handle.to_owned().binding(),
            inputs.tile_touched_offsets.handle.to_owned().binding(),
            slots.handle.to_owned().binding(),
            tile_indices.handle.to_owned().binding(),
        ],
    );

    Outputs {
        slots,
        tile_indices,
    }
}
