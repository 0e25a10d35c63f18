//! Transforming the points in depth order.

pub use super::*;

use burn::tensor::ops::{FloatTensorOps, IntTensorOps};
use bytemuck::{bytes_of, Pod, Zeroable};

/// Arguments.
///
/// The layout matches the struct in the kernel.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// $ M_v \in \mathbb{R}^{4 \times 4} =
    /// \begin{bmatrix} R_v & T_v \\\ 0 & 1 \end{bmatrix} $
    ///
    /// It is in column-major order.
    pub view_transform: [[f32; 4]; 4],
    /// $ V_p \in \mathbb{R}^3 $
    ///
    /// It is the position in world space.
    pub view_position: [f32; 3],
    /// $ 0 \sim 3 $
    pub colors_sh_degree_max: u32,
    /// $ \text{fl}_x = \frac{\text{im}_x}{2 \tan\left(\frac{\text{fov}_x}{2}\right)} $
    pub focal_length_x: f32,
    /// $ \text{fl}_y = \frac{\text{im}_y}{2 \tan\left(\frac{\text{fov}_y}{2}\right)} $
    pub focal_length_y: f32,
    /// $ \frac{\text{im}_x}{2} $
    pub image_size_half_x: f32,
    /// $ \frac{\text{im}_y}{2} $
    pub image_size_half_y: f32,
    /// $ 1.3 \cdot \tan\left(\frac{\text{fov}_x}{2}\right) $
    pub view_bound_x: f32,
    /// $ 1.3 \cdot \tan\left(\frac{\text{fov}_y}{2}\right) $
    pub view_bound_y: f32,
    /// The factor of all scalings.
    pub splat_scale: f32,
    /// $ P $
    pub point_count: u32,
    /// $ \frac{\text{im}_x}{t_x} $
    pub tile_count_x: u32,
    /// $ \frac{\text{im}_y}{t_y} $
    pub tile_count_y: u32,
    /// `0` or `1`
    pub has_colors_sh_rest: u32,
    /// Padding.
    pub _padding: u32,
}

/// Inputs.
#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[P, 3]`
    pub colors_rgb: JitTensor<R, F>,
    /// `[P, 3, 15]`, or `[1]` if absent.
    pub colors_sh_rest: JitTensor<R, F>,
    /// `[P]`
    pub opacities: JitTensor<R, F>,
    /// `[P]`, the point index of each slot.
    pub point_indices: JitTensor<R, I>,
    /// `[P, 3]`
    pub positions: JitTensor<R, F>,
    /// `[P, 4]` (x, y, z, w)
    pub rotations: JitTensor<R, F>,
    /// `[P, 3]`
    pub scalings: JitTensor<R, F>,
}

/// Outputs in slot order.
///
/// Culled points have zeros in every output.
#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[P, 4]`, the colors with opacities.
    pub colors_rgba: JitTensor<R, F>,
    /// `[P, 3]`
    ///
    /// $ \Sigma^{'-1} $ is symmetric, so it has 3 unique values.
    pub conics: JitTensor<R, F>,
    /// `[P, 2]`
    pub positions_2d: JitTensor<R, F>,
    /// `[P]`
    pub radii: JitTensor<R, I>,
    /// `[P, 4]`, i.e., `[x_min, y_min, x_max, y_max)` in tiles.
    pub tile_bounds: JitTensor<R, I>,
    /// `[P]`
    pub tile_touched_counts: JitTensor<R, I>,
}

/// Group size.
pub const GROUP_SIZE: u32 = 256;

/// Transforming the points.
///
/// For each slot $ s $ of the $ P $ slots, the point $ i $ sorted into it
/// goes through the following steps:
///
/// 1. Transform the 3D position $ P $ from world space to view space:
/// $$ P_v = R_v P + T_v \in \mathbb{R}^3 $$
///
/// 2. Cull the point if $ -P_v.z $ is no more than `0.2`.
///
/// 3. Compute the 3D covariance matrix from the rotation matrix $ R_s $
///    and the scaled scaling $ S_s $:
/// $$ \Sigma = (R_s S_s) (R_s S_s)^T \in \mathbb{R}^{3 \times 3} $$
///
/// 4. Project the 3D covariance matrix onto screen space
///    with the Jacobian $ J $ at the clamped position:
/// $$ \Sigma' = J R_v \Sigma R_v^T J^T + c_f I \in \mathbb{R}^{2 \times 2} $$
///
/// 5. Cull the point if $ \Sigma' $ is not invertible.
///
/// 6. Compute the radius from the larger eigenvalue of $ \Sigma' $:
/// $$ r = \lceil 3 \sqrt{\lambda_{\max}} \rceil $$
///
/// 7. Bound the touched tiles and evaluate the color in the view direction.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, F, I>,
) -> Outputs<R, F, I> {
    impl_kernel_source!(Kernel, "kernel.wgsl");

    // Specifying the parameters

    let client = &inputs.positions.client;
    let device = &inputs.positions.device;
    // P
    let point_count = (arguments.point_count as usize).max(1);

    // [P, 4]
    let colors_rgba =
        JitBackend::<R, F, I>::float_empty([point_count, 4].into(), device);
    // [P, 3]
    let conics = JitBackend::<R, F, I>::float_empty([point_count, 3].into(), device);
    // [P, 2]
    let positions_2d =
        JitBackend::<R, F, I>::float_empty([point_count, 2].into(), device);
    // [P]
    let radii = JitBackend::<R, F, I>::int_empty([point_count].into(), device);
    // [P, 4]
    let tile_bounds =
        JitBackend::<R, F, I>::int_empty([point_count, 4].into(), device);
    // [P]
    let tile_touched_counts =
        JitBackend::<R, F, I>::int_empty([point_count].into(), device);

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(Kernel, cube_dim_linear(GROUP_SIZE))),
        cube_count_linear(arguments.point_count.div_ceil(GROUP_SIZE)),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            inputs.colors_rgb.handle.binding(),
            inputs.colors_sh_rest.handle.binding(),
            inputs.opacities.handle.binding(),
            inputs.point_indices.handle.binding(),
            inputs.positions.handle.to_owned().binding(),
            inputs.rotations.handle.binding(),
            inputs.scalings.handle.binding(),
            colors_rgba.handle.to_owned().binding(),
            conics.handle.to_owned().binding(),
            positions_2d.handle.to_owned().binding(),
            radii.handle.to_owned().binding(),
            tile_bounds.handle.to_owned().binding(),
            tile_touched_counts.handle.to_owned().binding(),
        ],
    );

    Outputs {
        colors_rgba,
        conics,
        positions_2d,
        radii,
        tile_bounds,
        tile_touched_counts,
    }
}
