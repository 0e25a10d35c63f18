//! Sorting key-value pairs by the least significant digit first.

pub use super::*;

use burn::tensor::ops::IntTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

/// Arguments of one pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// `N`
    pub count: u32,
    /// `(0 ~ 32: +log2(R))`
    pub radix_shift: u32,
    /// `N / N'`
    pub tile_count: u32,
}

#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, I: IntElement> {
    /// `[N]`
    pub keys: JitTensor<R, I>,
    /// `[N]`
    pub values: JitTensor<R, I>,
}

#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, I: IntElement> {
    /// `[N]`
    pub keys: JitTensor<R, I>,
    /// `[N]`
    pub values: JitTensor<R, I>,
}

/// Two arenas of keys and values, one read and one written in each pass.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<R: JitRuntime, I: IntElement> {
    keys: [JitTensor<R, I>; 2],
    values: [JitTensor<R, I>; 2],
}

/// `G`
pub const GROUP_SIZE: u32 = RADIX_COUNT;
/// `|Key|`
pub const KEY_BIT_COUNT_MAX: u32 = u32::BITS;
/// `R`
pub const RADIX_COUNT: u32 = 1 << RADIX_COUNT_SHIFT;
/// `log2(R)`
pub const RADIX_COUNT_SHIFT: u32 = 8;
/// `N'`
pub const TILE_SIZE: u32 = GROUP_SIZE * 4;

impl<R: JitRuntime, I: IntElement> DoubleBuffer<R, I> {
    /// Allocating the spare arena for `keys` and `values`.
    pub fn new<F: FloatElement>(
        keys: JitTensor<R, I>,
        values: JitTensor<R, I>,
    ) -> Self {
        let device = &keys.device;
        let shape = keys.shape.to_owned();
        let keys_spare = JitBackend::<R, F, I>::int_empty(shape.to_owned(), device);
        let values_spare = JitBackend::<R, F, I>::int_empty(shape, device);

        Self {
            keys: [keys, keys_spare],
            values: [values, values_spare],
        }
    }

    /// The keys and values read in the pass.
    #[inline]
    pub fn current(
        &self,
        pass: u32,
    ) -> (&JitTensor<R, I>, &JitTensor<R, I>) {
        let index = (pass % 2) as usize;
        (&self.keys[index], &self.values[index])
    }

    /// The keys and values written in the pass.
    #[inline]
    pub fn alternate(
        &self,
        pass: u32,
    ) -> (&JitTensor<R, I>, &JitTensor<R, I>) {
        let index = ((pass + 1) % 2) as usize;
        (&self.keys[index], &self.values[index])
    }

    /// The keys and values after `pass_count` passes.
    pub fn into_current(
        self,
        pass_count: u32,
    ) -> (JitTensor<R, I>, JitTensor<R, I>) {
        let index = (pass_count % 2) as usize;
        let [keys_0, keys_1] = self.keys;
        let [values_0, values_1] = self.values;
        if index == 0 {
            (keys_0, values_0)
        } else {
            (keys_1, values_1)
        }
    }
}

/// Sorting the values by the lowest `key_bit_count` bits of keys.
///
/// It is stable and takes `key_bit_count / log2(R)` passes,
/// each of which launches 3 kernels:
///
/// 1. Counting the digits of each tile.
/// 2. Scanning the counts into offsets in radix-major order.
/// 3. Scattering the pairs of each tile in order.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    key_bit_count: u32,
    inputs: Inputs<R, I>,
) -> Outputs<R, I> {
    impl_kernel_source!(Kernel1, "kernel.1.wgsl");
    impl_kernel_source!(Kernel2, "kernel.2.wgsl");
    impl_kernel_source!(Kernel3, "kernel.3.wgsl");

    debug_assert!(key_bit_count <= KEY_BIT_COUNT_MAX);

    // Specifying the parameters

    let client = &inputs.keys.client.to_owned();
    let device = &inputs.keys.device.to_owned();
    // N
    let count = inputs.keys.shape.dims[0] as u32;
    // N / N'
    let tile_count = count.div_ceil(TILE_SIZE).max(1);
    let pass_count = key_bit_count.div_ceil(RADIX_COUNT_SHIFT);

    // [R, N / N']
    let counts_radix_tile = JitBackend::<R, F, I>::int_empty(
        [RADIX_COUNT as usize, tile_count as usize].into(),
        device,
    );
    let buffer = DoubleBuffer::new::<F>(inputs.keys, inputs.values);

    // Launching the kernels for each pass

    for pass in 0..pass_count {
        let arguments = client.create(bytes_of(&Arguments {
            count,
            radix_shift: pass * RADIX_COUNT_SHIFT,
            tile_count,
        }));
        let (keys_input, values_input) = buffer.current(pass);
        let (keys_output, values_output) = buffer.alternate(pass);

        // Launching the kernel 1

        client.execute(
            Box::new(SourceKernel::new(Kernel1, cube_dim_linear(GROUP_SIZE))),
            cube_count_linear(tile_count),
            vec![
                arguments.to_owned().binding(),
                keys_input.handle.to_owned().binding(),
                counts_radix_tile.handle.to_owned().binding(),
            ],
        );

        // Launching the kernel 2

        client.execute(
            Box::new(SourceKernel::new(Kernel2, cube_dim_linear(GROUP_SIZE))),
            CubeCount::Static(1, 1, 1),
            vec![
                arguments.to_owned().binding(),
                counts_radix_tile.handle.to_owned().binding(),
            ],
        );

        // Launching the kernel 3

        client.execute(
            Box::new(SourceKernel::new(Kernel3, cube_dim_linear(GROUP_SIZE))),
            cube_count_linear(tile_count),
            vec![
                arguments.binding(),
                counts_radix_tile.handle.to_owned().binding(),
                keys_input.handle.to_owned().binding(),
                values_input.handle.to_owned().binding(),
                keys_output.handle.to_owned().binding(),
                values_output.handle.to_owned().binding(),
            ],
        );
    }

    let (keys, values) = buffer.into_current(pass_count);

    Outputs { keys, values }
}
