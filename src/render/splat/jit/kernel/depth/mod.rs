//! Keying the points by depth.

pub use super::*;

use burn::tensor::ops::IntTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

/// Arguments.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// $ M_v \in \mathbb{R}^{4 \times 4} $ in column-major order.
    pub view_transform: [[f32; 4]; 4],
    /// $ P $
    pub point_count: u32,
    /// Padding.
    pub _padding: [u32; 3],
}

/// Inputs.
#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, F: FloatElement> {
    /// `[P, 3]`
    pub positions: JitTensor<R, F>,
}

/// Outputs.
#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, I: IntElement> {
    /// `[P]`
    ///
    /// The keys are `P_v.z` encoded in order, so the farthest comes first.
    pub depth_keys: JitTensor<R, I>,
    /// `[P]`
    ///
    /// The identity permutation.
    pub point_indices: JitTensor<R, I>,
}

/// Group size.
pub const GROUP_SIZE: u32 = 256;

/// Keying the points by depth.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, F>,
) -> Outputs<R, I> {
    impl_kernel_source!(Kernel, "kernel.wgsl");

    // Specifying the parameters

    let client = &inputs.positions.client;
    let device = &inputs.positions.device;
    // P
    let point_count = arguments.point_count as usize;

    // [P]
    let depth_keys =
        JitBackend::<R, F, I>::int_empty([point_count.max(1)].into(), device);
    // [P]
    let point_indices =
        JitBackend::<R, F, I>::int_empty([point_count.max(1)].into(), device);

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(Kernel, cube_dim_linear(GROUP_SIZE))),
        cube_count_linear(arguments.point_count.div_ceil(GROUP_SIZE)),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            inputs.positions.handle.to_owned().binding(),
            depth_keys.handle.to_owned().binding(),
            point_indices.handle.to_owned().binding(),
        ],
    );

    Outputs {
        depth_keys,
        point_indices,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[ignore = "requires a wgpu adapter"]
    fn depth_keys_match_host() {
        use super::*;
        use crate::{
            backend::{Wgpu, WgpuDevice, WgpuRuntime},
            render::{splat::projection::depth_key, View},
        };
        use burn::tensor::{ops::FloatTensorOps, TensorData};
        use bytemuck::pod_collect_to_vec;

        type B = Wgpu;
        type R = WgpuRuntime;
        type F = f32;
        type I = i32;
        let device = &WgpuDevice::default();

        let view = View::look_at([1.0, 2.0, 5.0], [0.0; 3], [0.0, 1.0, 0.0], 1.0, 8, 8)
            .unwrap();
        let view_transform = view.view_transform_f32();
        let positions_source = [[0.0, 0.0, 0.0], [1.0, -1.0, 3.0], [-4.0, 2.5, -9.0]];
        let point_count = positions_source.len();

        let positions = B::float_from_data(
            TensorData::new(positions_source.concat(), [point_count, 3]),
            device,
        );
        let Outputs {
            depth_keys,
            point_indices,
        } = main::<R, F, I>(
            Arguments {
                view_transform,
                point_count: point_count as u32,
                _padding: [0; 3],
            },
            Inputs { positions },
        );

        let depth_keys_output = pod_collect_to_vec::<u8, u32>(
            &depth_keys.client.read(depth_keys.handle.to_owned().binding()),
        );
        let point_indices_output = pod_collect_to_vec::<u8, u32>(
            &point_indices.client.read(point_indices.handle.to_owned().binding()),
        );
        let depth_keys_target = positions_source
            .iter()
            .map(|position| depth_key(&view_transform, position))
            .collect::<Vec<_>>();

        assert_eq!(point_indices_output, [0, 1, 2]);
        depth_keys_output
            .iter()
            .zip(&depth_keys_target)
            .enumerate()
            .for_each(|(index, (&output, &target))| {
                assert!(output.abs_diff(target) <= 4, "index: {index}");
            });
    }
}
