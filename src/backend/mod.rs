pub use burn::{
    backend::wgpu::{WgpuDevice, WgpuRuntime},
    tensor::backend::Backend,
};
pub use burn_jit::{FloatElement, IntElement, JitBackend, JitRuntime};

/// The default backend for rendering.
pub type Wgpu = JitBackend<WgpuRuntime, f32, i32>;
