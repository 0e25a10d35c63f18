//! Splat scene loading with a point ceiling.

pub use super::*;
pub use burn::config::Config;

use std::{fs, path::Path};

/// The default ceiling of points per scene.
pub const POINT_COUNT_MAX: usize = 1 << 22;

#[derive(Config, Copy, Debug, PartialEq)]
pub struct SplatLoadOptions {
    /// The scene is pruned to this many points if it has more.
    #[config(default = "POINT_COUNT_MAX")]
    pub point_count_max: usize,
}

/// A loaded scene and the container it can be persisted as.
#[derive(Clone, Debug)]
pub struct SplatLoad {
    /// The container of [`SplatLoad::scene`].
    ///
    /// It is the source if the scene is not pruned.
    pub bytes: Option<Vec<u8>>,
    /// Number of points in the source.
    pub point_count_source: usize,
    pub scene: SplatScene,
}

impl SplatLoadOptions {
    /// Deriving the ceiling from a device memory budget in bytes.
    pub fn from_memory_budget(
        size_budget: usize,
        has_colors_sh_rest: bool,
    ) -> Self {
        let point_count_max =
            size_budget / SplatScene::size_gpu_per_point(has_colors_sh_rest);
        Self::new().with_point_count_max(point_count_max.max(1))
    }
}

impl Default for SplatLoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SplatLoad {
    /// Whether the scene is pruned from the source.
    #[inline]
    pub fn is_pruned(&self) -> bool {
        self.scene.point_count() < self.point_count_source
    }

    /// Releasing the container bytes.
    ///
    /// It returns the released size in bytes.
    pub fn release_bytes(&mut self) -> usize {
        let size = self.bytes.take().map_or(0, |bytes| bytes.len());

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::viewer::splat::load",
            "release_bytes > {size} bytes",
        );

        size
    }
}

/// Scene loaders
impl SplatScene {
    /// Decoding the scene and keeping it under the ceiling.
    ///
    /// If pruned, the scene is encoded again to replace the source bytes.
    pub fn load(
        bytes: Vec<u8>,
        options: &SplatLoadOptions,
    ) -> Result<SplatLoad, Error> {
        let scene = Self::decode(&bytes)?;
        let point_count_source = scene.point_count();
        let point_count_max = options.point_count_max;

        if point_count_source <= point_count_max {
            log::info!(
                target: "gausplat::viewer::splat::load",
                "loaded {point_count_source} points ({})",
                scene.size_readable(),
            );

            return Ok(SplatLoad {
                bytes: Some(bytes),
                point_count_source,
                scene,
            });
        }

        drop(bytes);
        let scene = scene.prune(point_count_max);
        let bytes = scene.encode_polygon_to_vec()?;

        log::info!(
            target: "gausplat::viewer::splat::load",
            "loaded {} of {point_count_source} points ({})",
            scene.point_count(),
            scene.size_readable(),
        );

        Ok(SplatLoad {
            bytes: Some(bytes),
            point_count_source,
            scene,
        })
    }

    /// Loading the scene from the file at `path`.
    pub fn load_file(
        path: impl AsRef<Path>,
        options: &SplatLoadOptions,
    ) -> Result<SplatLoad, Error> {
        Self::load(fs::read(path)?, options)
    }
}
