pub mod cpu;
pub mod jit;
pub mod projection;
pub mod style;

pub use super::view::View;
pub use crate::{
    error::Error,
    scene::splat::{SceneId, SplatScene},
    spherical_harmonics::SH_DEGREE_MAX,
};
pub use burn::config::Config;
pub use cpu::CpuRenderer;
pub use jit::JitRenderer;

use humansize::{format_size, BINARY};
use std::{fmt, sync::Arc};

/// A renderer holding at most one resident scene.
pub trait SplatRenderer: fmt::Debug {
    /// Making `scene` resident.
    ///
    /// It is skipped if the scene is already resident.
    /// The previous scene is replaced only after the new one is ready.
    fn upload(
        &mut self,
        scene: &Arc<SplatScene>,
    ) -> Result<Upload, Error>;

    /// Rendering the resident scene.
    ///
    /// Nothing is drawn if no scene is resident.
    fn render(
        &mut self,
        view: &View,
        options: &RenderOptions,
    ) -> Result<Frame, Error>;

    /// Number of resident points.
    fn point_count(&self) -> usize;

    /// The identity of the resident scene.
    fn scene_id(&self) -> Option<SceneId>;

    /// Approximate size of the resident data in bytes.
    fn size(&self) -> usize;

    /// Readable size of the resident data.
    #[inline]
    fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

/// The result of [`SplatRenderer::upload`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Upload {
    /// The scene replaced the resident one.
    Uploaded,
    /// The scene was already resident.
    Skipped,
}

#[derive(Config, Copy, Debug, Eq, PartialEq)]
pub enum ColorMode {
    Natural,
    Monochrome,
}

#[derive(Config, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// The mode applied after saturation.
    #[config(default = "ColorMode::Natural")]
    pub color_mode: ColorMode,

    #[config(default = "SH_DEGREE_MAX")]
    /// It should be no more than [`SH_DEGREE_MAX`].
    pub colors_sh_degree_max: u32,

    /// Stops of exposure, i.e., colors are scaled by `2 ^ exposure`.
    #[config(default = 0.0)]
    pub exposure: f32,

    /// It should be positive.
    #[config(default = 1.0)]
    pub gamma: f32,

    /// `0.0` is gray and `1.0` is unchanged.
    #[config(default = 1.0)]
    pub saturation: f32,

    /// The factor of all scalings.
    #[config(default = 1.0)]
    pub splat_scale: f32,

    /// The darkening at the corners, from `0.0` to `1.0`.
    #[config(default = 0.0)]
    pub vignette_strength: f32,
}

/// An image in row-major order.
#[derive(Clone, PartialEq)]
pub struct Frame {
    /// `[I_y, I_x, 4]`
    pub colors_rgba: Vec<[f32; 4]>,
    pub image_height: u32,
    pub image_width: u32,
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), Error> {
        let checks = [
            (
                "colors_sh_degree_max",
                self.colors_sh_degree_max as f32,
                self.colors_sh_degree_max <= SH_DEGREE_MAX,
                "no more than 3",
            ),
            ("exposure", self.exposure, self.exposure.is_finite(), "finite"),
            ("gamma", self.gamma, self.gamma > 0.0 && self.gamma.is_finite(), "positive"),
            ("saturation", self.saturation, self.saturation >= 0.0, "non-negative"),
            (
                "splat_scale",
                self.splat_scale,
                self.splat_scale > 0.0 && self.splat_scale.is_finite(),
                "positive",
            ),
            (
                "vignette_strength",
                self.vignette_strength,
                (0.0..=1.0).contains(&self.vignette_strength),
                "in [0, 1]",
            ),
        ];

        for (name, value, is_valid, expected) in checks {
            if !is_valid {
                return Err(Error::Validation(
                    format!("{name} ({value})"),
                    expected.into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ColorMode {
    #[inline]
    fn default() -> Self {
        Self::Natural
    }
}

impl Default for RenderOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// A transparent black image.
    pub fn zeros(
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            colors_rgba: vec![[0.0; 4]; image_width as usize * image_height as usize],
            image_height,
            image_width,
        }
    }

    /// The pixel at `(x, y)`.
    #[inline]
    pub fn pixel(
        &self,
        x: u32,
        y: u32,
    ) -> [f32; 4] {
        self.colors_rgba[(y * self.image_width + x) as usize]
    }
}

impl fmt::Debug for Frame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("Frame")
            .field("image_width", &self.image_width)
            .field("image_height", &self.image_height)
            .field("colors_rgba.len()", &self.colors_rgba.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn render_options_default_and_validate() {
        use super::*;

        let options = RenderOptions::default();
        assert_eq!(options.color_mode, ColorMode::Natural);
        assert_eq!(options.colors_sh_degree_max, SH_DEGREE_MAX);
        assert_eq!(options.gamma, 1.0);
        options.validate().unwrap();

        let sources = [
            RenderOptions::new().with_colors_sh_degree_max(4),
            RenderOptions::new().with_gamma(0.0),
            RenderOptions::new().with_saturation(-0.5),
            RenderOptions::new().with_splat_scale(f32::NAN),
            RenderOptions::new().with_vignette_strength(1.5),
            RenderOptions::new().with_exposure(f32::INFINITY),
        ];
        for source in sources {
            let output = source.validate();
            assert!(matches!(output, Err(Error::Validation(_, _))), "{output:?}");
        }
    }

    #[test]
    fn frame_zeros() {
        use super::*;

        let frame = Frame::zeros(3, 2);
        assert_eq!(frame.colors_rgba.len(), 6);
        assert_eq!(frame.pixel(2, 1), [0.0; 4]);
    }
}
