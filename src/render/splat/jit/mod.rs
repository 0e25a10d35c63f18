//! Rendering splats on a JIT device.

pub mod kernel;

pub use super::*;
pub use crate::backend::{FloatElement, IntElement, JitBackend, JitRuntime};

use super::{
    projection::{Projector, TILE_COUNT_MAX},
    style::Style,
};
use crate::{backend::WgpuRuntime, spherical_harmonics::SH_REST_COUNT};
use burn::tensor::{ops::FloatTensorOps, Tensor, TensorData, TensorPrimitive};
use bytemuck::pod_read_unaligned;
use kernel::*;
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

/// The renderer on the default device.
pub type WgpuRenderer = JitRenderer<WgpuRuntime, f32, i32>;

/// A renderer of splats on a JIT device.
///
/// The per-frame pipeline:
///
/// 1. Keying the points by depth.
/// 2. Sorting the points by the keys from far to near.
/// 3. Transforming the sorted points onto screen space.
/// 4. Scanning the counts of touched tiles into offsets.
/// 5. Ranking the points by tile.
/// 6. Sorting the pairs by tile, keeping the depth order in each tile.
/// 7. Segmenting the pairs into tiles.
/// 8. Rasterizing and grading each tile.
pub struct JitRenderer<R: JitRuntime, F: FloatElement, I: IntElement> {
    device: R::Device,
    point_count_max: usize,
    resident: Option<Resident<R, F, I>>,
}

/// The buffers of a resident scene.
struct Resident<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[P, 3]`
    colors_rgb: JitTensor<R, F>,
    /// `[P, 3, 15]`, or `[1]` if absent.
    colors_sh_rest: JitTensor<R, F>,
    has_colors_sh_rest: bool,
    /// `[P]`
    opacities: JitTensor<R, F>,
    point_count: usize,
    /// `[P, 3]`
    positions: JitTensor<R, F>,
    /// `[P, 4]`
    rotations: JitTensor<R, F>,
    /// `[P, 3]`
    scalings: JitTensor<R, F>,
    scene_id: SceneId,
    size: usize,
    __: std::marker::PhantomData<I>,
}

impl<R: JitRuntime, F: FloatElement, I: IntElement> JitRenderer<R, F, I> {
    /// Creating the renderer and compiling its kernels.
    ///
    /// It fails if the device cannot run the kernels.
    pub fn new(
        device: R::Device,
        point_count_max: usize,
    ) -> Result<Self, Error> {
        let mut renderer = Self {
            device,
            point_count_max: point_count_max.max(1),
            resident: None,
        };

        // Warming up with a visible point
        let scene = Arc::new(SplatScene::new(
            vec![[0.0; 3]],
            vec![[1.0; 3]],
            vec![1.0],
            vec![[0.1; 3]],
            vec![[0.0, 0.0, 0.0, 1.0]],
            Some(vec![0.0; SH_REST_COUNT]),
        )?);
        let view = View::look_at(
            [0.0, 0.0, 5.0],
            [0.0; 3],
            [0.0, 1.0, 0.0],
            std::f64::consts::FRAC_PI_2,
            16,
            16,
        )?;
        catch_unwind(AssertUnwindSafe(|| -> Result<(), Error> {
            renderer.upload(&scene)?;
            renderer.render_tensor(&view, &RenderOptions::default())?;
            Ok(())
        }))
        .map_err(|panic| Error::PipelineConstruction(panic_message(panic.as_ref())))??;
        renderer.resident = None;

        log::info!(
            target: "gausplat::viewer::render::jit",
            "new > ready on {:?}",
            renderer.device,
        );

        Ok(renderer)
    }

    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.device
    }

    #[inline]
    pub fn point_count_max(&self) -> usize {
        self.point_count_max
    }

    /// Rendering the resident scene into a tensor of `[I_y, I_x, 4]`.
    pub fn render_tensor(
        &self,
        view: &View,
        options: &RenderOptions,
    ) -> Result<Tensor<JitBackend<R, F, I>, 3>, Error> {
        let projector = Projector::new(view, options)?;
        if projector.tile_count_x > GROUP_COUNT_DIM_MAX
            || projector.tile_count_y > GROUP_COUNT_DIM_MAX
        {
            return Err(Error::Validation(
                format!(
                    "tile count ({}x{})",
                    projector.tile_count_x, projector.tile_count_y
                ),
                format!("no more than {GROUP_COUNT_DIM_MAX} along each side"),
            ));
        }
        let style = Style::new(options);

        // I_x
        let image_size_x = projector.image_size_x;
        // I_y
        let image_size_y = projector.image_size_y;
        let zeros = || {
            Tensor::new(TensorPrimitive::Float(JitBackend::<R, F, I>::float_zeros(
                [image_size_y as usize, image_size_x as usize, 4].into(),
                &self.device,
            )))
        };

        let resident = match &self.resident {
            Some(resident) if resident.point_count > 0 => resident,
            _ => return Ok(zeros()),
        };
        // P
        let point_count = resident.point_count as u32;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::jit", "render_tensor > depth");

        let outputs_depth = depth::main::<R, F, I>(
            depth::Arguments {
                view_transform: projector.view_transform,
                point_count,
                _padding: [0; 3],
            },
            depth::Inputs {
                positions: resident.positions.to_owned(),
            },
        );

        // Sorting the points by depth from far to near

        let outputs_sort_depth = sort::radix::main::<R, F, I>(
            u32::BITS,
            sort::radix::Inputs {
                keys: outputs_depth.depth_keys,
                values: outputs_depth.point_indices,
            },
        );

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::jit", "render_tensor > transform");

        let outputs_transform = transform::main::<R, F, I>(
            transform::Arguments {
                view_transform: projector.view_transform,
                view_position: projector.view_position,
                colors_sh_degree_max: projector.colors_sh_degree_max,
                focal_length_x: projector.focal_length_x,
                focal_length_y: projector.focal_length_y,
                image_size_half_x: projector.image_size_half_x,
                image_size_half_y: projector.image_size_half_y,
                view_bound_x: projector.view_bound_x,
                view_bound_y: projector.view_bound_y,
                splat_scale: projector.splat_scale,
                point_count,
                tile_count_x: projector.tile_count_x,
                tile_count_y: projector.tile_count_y,
                has_colors_sh_rest: resident.has_colors_sh_rest as u32,
                _padding: 0,
            },
            transform::Inputs {
                colors_rgb: resident.colors_rgb.to_owned(),
                colors_sh_rest: resident.colors_sh_rest.to_owned(),
                opacities: resident.opacities.to_owned(),
                point_indices: outputs_sort_depth.values,
                positions: resident.positions.to_owned(),
                rotations: resident.rotations.to_owned(),
                scalings: resident.scalings.to_owned(),
            },
        );

        // Scanning the counts of touched tiles into offsets

        let outputs_scan = scan::add::main::<R, F, I>(scan::add::Inputs {
            values: outputs_transform.tile_touched_counts,
        });
        // T
        let tile_point_count = {
            let total = &outputs_scan.total;
            let bytes = total.client.read(total.handle.to_owned().binding());
            pod_read_unaligned::<u32>(&bytes[..size_of::<u32>()])
        };

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::viewer::render::jit",
            "render_tensor > {tile_point_count} tile points",
        );

        if tile_point_count == 0 {
            return Ok(zeros());
        }

        let outputs_rank = rank::main::<R, F, I>(
            rank::Arguments {
                point_count,
                tile_count_x: projector.tile_count_x,
            },
            rank::Inputs {
                tile_bounds: outputs_transform.tile_bounds,
                tile_touched_offsets: outputs_scan.values,
            },
            tile_point_count,
        );

        // Sorting the pairs by tile, where the pairs of each tile stay in depth order

        let outputs_sort_tile = sort::radix::main::<R, F, I>(
            TILE_COUNT_MAX.trailing_zeros(),
            sort::radix::Inputs {
                keys: outputs_rank.tile_indices,
                values: outputs_rank.slots,
            },
        );

        let outputs_segment = segment::main::<R, F, I>(
            segment::Arguments {
                tile_point_count,
                tile_count: projector.tile_count(),
            },
            segment::Inputs {
                tile_indices: outputs_sort_tile.keys,
            },
        );

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::jit", "render_tensor > rasterize");

        let outputs_rasterize = rasterize::main::<R, F, I>(
            rasterize::Arguments {
                image_size_x,
                image_size_y,
                tile_count_x: projector.tile_count_x,
                tile_count_y: projector.tile_count_y,
                exposure_factor: style.exposure_factor,
                gamma_inverse: style.gamma_inverse,
                is_monochrome: style.is_monochrome as u32,
                saturation: style.saturation,
                vignette_strength: style.vignette_strength,
                _padding: [0; 3],
            },
            rasterize::Inputs {
                colors_rgba: outputs_transform.colors_rgba,
                conics: outputs_transform.conics,
                positions_2d: outputs_transform.positions_2d,
                radii: outputs_transform.radii,
                slots: outputs_sort_tile.values,
                tile_point_ranges: outputs_segment.tile_point_ranges,
            },
        );

        Ok(Tensor::new(TensorPrimitive::Float(
            outputs_rasterize.colors_rgba_2d,
        )))
    }
}

impl<R: JitRuntime, F: FloatElement, I: IntElement> Resident<R, F, I> {
    fn new(
        scene: &SplatScene,
        device: &R::Device,
    ) -> Self {
        let point_count = scene.point_count();
        let rows = point_count.max(1);

        let colors_rgb = Self::from_values(scene.colors_rgb().concat(), [rows, 3], device);
        let colors_sh_rest = match scene.colors_sh_rest() {
            Some(colors_sh_rest) => {
                Self::from_values(colors_sh_rest.to_vec(), [rows, SH_REST_COUNT], device)
            },
            None => Self::from_values(vec![], [1], device),
        };
        let opacities = Self::from_values(scene.opacities().to_vec(), [rows], device);
        let positions = Self::from_values(scene.positions().concat(), [rows, 3], device);
        let rotations = Self::from_values(scene.rotations().concat(), [rows, 4], device);
        let scalings = Self::from_values(scene.scalings().concat(), [rows, 3], device);

        Self {
            colors_rgb,
            colors_sh_rest,
            has_colors_sh_rest: scene.has_colors_sh_rest(),
            opacities,
            point_count,
            positions,
            rotations,
            scalings,
            scene_id: scene.id(),
            size: scene.size_gpu(),
            __: std::marker::PhantomData,
        }
    }

    /// Uploading the values, padded with zeros to fill the shape.
    fn from_values<const D: usize>(
        mut values: Vec<f32>,
        shape: [usize; D],
        device: &R::Device,
    ) -> JitTensor<R, F> {
        values.resize(shape.iter().product(), 0.0);
        JitBackend::<R, F, I>::float_from_data(TensorData::new(values, shape), device)
    }
}

impl<R: JitRuntime, F: FloatElement, I: IntElement> SplatRenderer
    for JitRenderer<R, F, I>
{
    fn upload(
        &mut self,
        scene: &Arc<SplatScene>,
    ) -> Result<Upload, Error> {
        if self.scene_id() == Some(scene.id()) {
            return Ok(Upload::Skipped);
        }

        let point_count = scene.point_count();
        if point_count > self.point_count_max {
            return Err(Error::ExceededPointCount(point_count, self.point_count_max));
        }

        // The previous buffers are released after the new ones are ready.
        let resident = Resident::new(scene, &self.device);
        self.resident = Some(resident);

        log::info!(
            target: "gausplat::viewer::render::jit",
            "upload > {point_count} points ({})",
            self.size_readable(),
        );

        Ok(Upload::Uploaded)
    }

    fn render(
        &mut self,
        view: &View,
        options: &RenderOptions,
    ) -> Result<Frame, Error> {
        let colors_rgba = self
            .render_tensor(view, options)?
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|error| Error::Readback(format!("{error:?}")))?;

        Ok(Frame {
            colors_rgba: bytemuck::cast_slice::<f32, [f32; 4]>(&colors_rgba).to_vec(),
            image_height: view.image_height,
            image_width: view.image_width,
        })
    }

    #[inline]
    fn point_count(&self) -> usize {
        self.resident.as_ref().map_or(0, |resident| resident.point_count)
    }

    #[inline]
    fn scene_id(&self) -> Option<SceneId> {
        self.resident.as_ref().map(|resident| resident.scene_id)
    }

    #[inline]
    fn size(&self) -> usize {
        self.resident.as_ref().map_or(0, |resident| resident.size)
    }
}

impl<R: JitRuntime, F: FloatElement, I: IntElement> fmt::Debug
    for JitRenderer<R, F, I>
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct(&format!("JitRenderer<{}>", R::name()))
            .field("device", &self.device)
            .field("point_count_max", &self.point_count_max)
            .field("point_count", &self.point_count())
            .field("scene_id", &self.scene_id())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
