//! Rasterizing the points into the image.

pub use super::*;
pub use crate::render::splat::projection::{TILE_SIZE_X, TILE_SIZE_Y};

use burn::tensor::ops::FloatTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

/// Arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// `I_x`
    pub image_size_x: u32,
    /// `I_y`
    pub image_size_y: u32,
    /// `I_x / T_x`
    pub tile_count_x: u32,
    /// `I_y / T_y`
    pub tile_count_y: u32,
    /// `2 ^ exposure`
    pub exposure_factor: f32,
    /// `1 / gamma`
    pub gamma_inverse: f32,
    /// `0` or `1`
    pub is_monochrome: u32,
    pub saturation: f32,
    pub vignette_strength: f32,
    /// Padding.
    pub _padding: [u32; 3],
}

/// Inputs.
#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[P, 4]`
    pub colors_rgba: JitTensor<R, F>,
    /// `[P, 3]`
    pub conics: JitTensor<R, F>,
    /// `[P, 2]`
    pub positions_2d: JitTensor<R, F>,
    /// `[P]`
    pub radii: JitTensor<R, I>,
    /// `[T]`, the slots sorted by tile.
    pub slots: JitTensor<R, I>,
    /// `[(I_y / T_y) * (I_x / T_x), 2]`
    pub tile_point_ranges: JitTensor<R, I>,
}

/// Outputs.
#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, F: FloatElement> {
    /// `[I_y, I_x, 4]`
    pub colors_rgba_2d: JitTensor<R, F>,
}

/// Compositing the points of each tile from far to near,
/// then grading the colors.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, F, I>,
) -> Outputs<R, F> {
    impl_kernel_source!(Kernel, "kernel.wgsl");

    // Specifying the parameters

    let client = &inputs.colors_rgba.client;
    let device = &inputs.colors_rgba.device;
    // I_x
    let image_size_x = arguments.image_size_x as usize;
    // I_y
    let image_size_y = arguments.image_size_y as usize;

    // [I_y, I_x, 4]
    let colors_rgba_2d = JitBackend::<R, F, I>::float_empty(
        [image_size_y, image_size_x, 4].into(),
        device,
    );

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(
            Kernel,
            CubeDim {
                x: TILE_SIZE_X,
                y: TILE_SIZE_Y,
                z: 1,
            },
        )),
        CubeCount::Static(arguments.tile_count_x, arguments.tile_count_y, 1),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            inputs.colors_rgba.handle.to_owned().binding(),
            inputs.conics.handle.binding(),
            inputs.positions_2d.handle.binding(),
            inputs.radii.handle.binding(),
            inputs.slots.handle.binding(),
            inputs.tile_point_ranges.handle.binding(),
            colors_rgba_2d.handle.to_owned().binding(),
        ],
    );

    Outputs { colors_rgba_2d }
}
