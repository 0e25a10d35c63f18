//! Grading composited colors.

pub use super::*;

/// The luminance weights of linear RGB.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// The grading applied to every pixel after compositing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub exposure_factor: f32,
    pub gamma_inverse: f32,
    pub is_monochrome: bool,
    pub saturation: f32,
    pub vignette_strength: f32,
}

impl Style {
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            exposure_factor: options.exposure.exp2(),
            gamma_inverse: 1.0 / options.gamma,
            is_monochrome: options.color_mode == ColorMode::Monochrome,
            saturation: options.saturation,
            vignette_strength: options.vignette_strength,
        }
    }

    /// Grading the color at pixel `(x, y)` of an image sized `(width, height)`.
    ///
    /// The result is in `[0, 1]`.
    pub fn grade(
        &self,
        color_rgb: [f32; 3],
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> [f32; 3] {
        let mut color = color_rgb.map(|c| c * self.exposure_factor);

        if self.saturation != 1.0 {
            let luma = luma(&color);
            color = color.map(|c| luma + (c - luma) * self.saturation);
        }
        if self.is_monochrome {
            let luma = luma(&color);
            color = [luma; 3];
        }

        if self.gamma_inverse != 1.0 {
            color = color.map(|c| c.max(0.0).powf(self.gamma_inverse));
        }

        if self.vignette_strength > 0.0 {
            let half_x = width as f32 / 2.0;
            let half_y = height as f32 / 2.0;
            let offset_x = (x as f32 + 0.5 - half_x) / half_x;
            let offset_y = (y as f32 + 0.5 - half_y) / half_y;
            let distance_2 = (offset_x * offset_x + offset_y * offset_y) / 2.0;
            let factor = 1.0 - self.vignette_strength * distance_2;
            color = color.map(|c| c * factor);
        }

        color.map(|c| c.clamp(0.0, 1.0))
    }
}

impl Default for Style {
    #[inline]
    fn default() -> Self {
        Self::new(&RenderOptions::default())
    }
}

#[inline]
pub fn luma(color_rgb: &[f32; 3]) -> f32 {
    LUMA_WEIGHTS[0] * color_rgb[0]
        + LUMA_WEIGHTS[1] * color_rgb[1]
        + LUMA_WEIGHTS[2] * color_rgb[2]
}
