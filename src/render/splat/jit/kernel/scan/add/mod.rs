pub use super::*;

use burn::tensor::ops::IntTensorOps;
use bytemuck::{bytes_of, Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Arguments {
    /// `N`
    pub count: u32,
}

#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, I: IntElement> {
    /// The values to scan.
    pub values: JitTensor<R, I>,
}

#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, I: IntElement> {
    /// The exclusively scanned values.
    pub values: JitTensor<R, I>,
    /// The total of scanned values.
    pub total: JitTensor<R, I>,
}

/// `N / N'`
pub const GROUP_SIZE: u32 = 256;

/// Scanning the values exclusively in place.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    inputs: Inputs<R, I>
) -> Outputs<R, I> {
    impl_kernel_source!(Kernel1, "kernel.1.wgsl");
    impl_kernel_source!(Kernel2, "kernel.2.wgsl");

    // Specifying the parameters

    // [N]
    let values = inputs.values;
    let client = &values.client;
    let device = &values.device;
    // N
    let count = values.shape.dims[0] as u32;
    // N'
    let count_next = count.div_ceil(GROUP_SIZE).max(1);
    let arguments = client.create(bytes_of(&Arguments { count }));

    // [N']
    let values_next =
        JitBackend::<R, F, I>::int_empty([count_next as usize].into(), device);

    // Launching the kernel 1

    client.execute(
        Box::new(SourceKernel::new(Kernel1, cube_dim_linear(GROUP_SIZE))),
        cube_count_linear(count_next),
        vec![
            arguments.to_owned().binding(),
            values.handle.to_owned().binding(),
            values_next.handle.to_owned().binding(),
        ],
    );

    let total = if count_next > 1 {
        // Recursing if there is more than one remaining group

        let Outputs {
            total,
            values: values_next,
        } = main::<R, F, I>(Inputs {
            values: values_next,
        });

        // Launching the kernel 2

        client.execute(
            Box::new(SourceKernel::new(Kernel2, cube_dim_linear(GROUP_SIZE))),
            cube_count_linear(count_next),
            vec![
                arguments.binding(),
                values.handle.to_owned().binding(),
                values_next.handle.binding(),
            ],
        );

        total
    } else {
        // Returning the next values if there is only one group
        values_next
    };

    Outputs { total, values }
}
