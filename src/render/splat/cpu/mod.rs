//! Rendering splats on the host.

pub mod sort;

pub use super::*;

use super::{
    projection::{depth_key, Projected, Projector, TILE_SIZE_X, TILE_SIZE_Y},
    style::Style,
};
use crate::{scene::splat::POINT_COUNT_MAX, spherical_harmonics::SH_REST_COUNT};
use rayon::{
    iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// A renderer of splats on the host.
///
/// Frames match [`JitRenderer`] up to floating-point tolerance.
#[derive(Clone, Debug)]
pub struct CpuRenderer {
    point_count_max: usize,
    scene: Option<Arc<SplatScene>>,
}

impl CpuRenderer {
    /// A renderer accepting scenes of no more than `point_count_max` points.
    pub fn new(point_count_max: usize) -> Self {
        Self {
            point_count_max,
            scene: None,
        }
    }

    /// The resident scene.
    #[inline]
    pub fn scene(&self) -> Option<&Arc<SplatScene>> {
        self.scene.as_ref()
    }

    /// Rendering `scene` without making it resident.
    pub fn render_scene(
        scene: &SplatScene,
        view: &View,
        options: &RenderOptions,
    ) -> Result<Frame, Error> {
        let projector = Projector::new(view, options)?;
        let style = Style::new(options);
        let image_size_x = projector.image_size_x;
        let image_size_y = projector.image_size_y;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::cpu", "render_scene > sort");

        // Sorting the points by depth from far to near
        let point_count = scene.point_count();
        let depths = scene
            .positions()
            .par_iter()
            .map(|position| depth_key(&projector.view_transform, position))
            .collect::<Vec<_>>();
        let (_, point_indices) =
            sort::sort(depths, (0..point_count as u32).collect(), u32::BITS);

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::cpu", "render_scene > project");

        let colors_sh_rest = scene.colors_sh_rest();
        let points = point_indices
            .par_iter()
            .map(|&index| {
                let index = index as usize;
                projector.project(
                    &scene.positions()[index],
                    &scene.colors_rgb()[index],
                    colors_sh_rest
                        .map(|c| &c[index * SH_REST_COUNT..(index + 1) * SH_REST_COUNT]),
                    scene.opacities()[index],
                    &scene.rotations()[index],
                    &scene.scalings()[index],
                )
            })
            .collect::<Vec<_>>();

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::cpu", "render_scene > bin");

        // Points of each tile from far to near
        let mut tiles = vec![Vec::<&Projected>::new(); projector.tile_count() as usize];
        points.iter().flatten().for_each(|point| {
            let [x_min, y_min, x_max, y_max] = point.tile_bounds;
            for tile_y in y_min..y_max {
                for tile_x in x_min..x_max {
                    tiles[(tile_y * projector.tile_count_x + tile_x) as usize].push(point);
                }
            }
        });

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(target: "gausplat::viewer::render::cpu", "render_scene > rasterize");

        let mut frame = Frame::zeros(image_size_x, image_size_y);
        frame
            .colors_rgba
            .par_chunks_mut(image_size_x as usize)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as u32;
                let tile_y = y / TILE_SIZE_Y;
                let center_y = y as f32 + 0.5;
                row.iter_mut().enumerate().for_each(|(x, pixel)| {
                    let x = x as u32;
                    let tile = (tile_y * projector.tile_count_x + x / TILE_SIZE_X) as usize;
                    let center_x = x as f32 + 0.5;

                    let mut color = [0.0; 3];
                    let mut opacity = 0.0;
                    for point in &tiles[tile] {
                        let alpha = match point.alpha(center_x, center_y) {
                            Some(alpha) => alpha,
                            None => continue,
                        };
                        let beta = 1.0 - alpha;
                        color = [0, 1, 2].map(|c| alpha * point.color_rgba[c] + beta * color[c]);
                        opacity = alpha + beta * opacity;
                    }

                    let [r, g, b] = style.grade(color, x, y, image_size_x, image_size_y);
                    *pixel = [r, g, b, opacity];
                });
            });

        Ok(frame)
    }
}

impl Default for CpuRenderer {
    #[inline]
    fn default() -> Self {
        Self::new(POINT_COUNT_MAX)
    }
}

impl SplatRenderer for CpuRenderer {
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

        log::info!(
            target: "gausplat::viewer::render::cpu",
            "upload > {point_count} points ({})",
            scene.size_readable(),
        );

        self.scene = Some(scene.to_owned());
        Ok(Upload::Uploaded)
    }

    fn render(
        &mut self,
        view: &View,
        options: &RenderOptions,
    ) -> Result<Frame, Error> {
        match &self.scene {
            Some(scene) => Self::render_scene(scene, view, options),
            None => {
                Projector::new(view, options)?;
                Ok(Frame::zeros(view.image_width, view.image_height))
            },
        }
    }

    #[inline]
    fn point_count(&self) -> usize {
        self.scene.as_ref().map_or(0, |scene| scene.point_count())
    }

    #[inline]
    fn scene_id(&self) -> Option<SceneId> {
        self.scene.as_ref().map(|scene| scene.id())
    }

    #[inline]
    fn size(&self) -> usize {
        self.scene.as_ref().map_or(0, |scene| scene.size())
    }
}
