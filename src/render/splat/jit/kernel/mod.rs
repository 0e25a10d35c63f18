//! JIT kernels.

pub mod depth;
pub mod rank;
pub mod rasterize;
pub mod scan;
pub mod segment;
pub mod sort;
pub mod transform;

pub use crate::backend::{FloatElement, IntElement, JitBackend, JitRuntime};
pub use burn_jit::{
    cubecl::KernelId,
    template::{KernelSource, SourceTemplate},
    tensor::JitTensor,
};

use burn_jit::{
    cubecl::{CubeCount, CubeDim},
    template::SourceKernel,
};

/// The maximum count of groups along one dimension.
pub const GROUP_COUNT_DIM_MAX: u32 = (1 << 16) - 1;

macro_rules! impl_kernel_source {
    ($kernel: ident, $source_path: expr) => {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $kernel;

        impl KernelSource for $kernel {
            fn source(&self) -> SourceTemplate {
                SourceTemplate::new(include_str!($source_path))
            }

            fn id(&self) -> KernelId {
                KernelId::new::<Self>()
            }
        }
    };
}

pub(crate) use impl_kernel_source;

/// Covering `group_count` groups with no more than
/// [`GROUP_COUNT_DIM_MAX`] groups along `x`.
///
/// Kernels linearize the group index as `x + y * X`.
pub fn cube_count_linear(group_count: u32) -> CubeCount {
    let group_count = group_count.max(1);
    let x = group_count.min(GROUP_COUNT_DIM_MAX);
    let y = group_count.div_ceil(x);
    CubeCount::Static(x, y, 1)
}

/// A one-dimensional cube of `size` invocations.
#[inline]
pub const fn cube_dim_linear(size: u32) -> CubeDim {
    CubeDim { x: size, y: 1, z: 1 }
}

#[cfg(test)]
mod tests {
    #[test]
    fn cube_count_linear() {
        use super::*;

        let output = cube_count_linear(0);
        assert!(matches!(output, CubeCount::Static(1, 1, 1)));

        let output = cube_count_linear(300);
        assert!(matches!(output, CubeCount::Static(300, 1, 1)));

        let output = cube_count_linear(GROUP_COUNT_DIM_MAX + 1);
        assert!(matches!(output, CubeCount::Static(GROUP_COUNT_DIM_MAX, 2, 1)));
    }
}
