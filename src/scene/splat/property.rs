//! Splat scene property implementation.

pub use super::*;

use humansize::{format_size, BINARY};

/// Estimated GPU bytes of the per-frame buffers of one point,
/// including depth keys, projected attributes and tile entries.
pub const SIZE_GPU_FRAME_PER_POINT: usize = 144;

/// Outer property value getters
impl SplatScene {
    /// Colors in RGB space.
    ///
    /// They range from `0.0` to `1.0`.
    #[inline]
    pub fn colors_rgb(&self) -> &[[f32; 3]] {
        &self.colors_rgb
    }

    /// Higher-order colors in SH space.
    ///
    /// The shape is `[P, 3, 15]` in container order.
    #[inline]
    pub fn colors_sh_rest(&self) -> Option<&[f32]> {
        self.colors_sh_rest.as_deref()
    }

    /// Opacities.
    ///
    /// They range from `0.0` to `1.0`.
    #[inline]
    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    /// 3D Positions.
    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Rotations.
    ///
    /// They are represented as normalized Hamilton quaternions in scalar-last order,
    /// i.e., `[x, y, z, w]`.
    #[inline]
    pub fn rotations(&self) -> &[[f32; 4]] {
        &self.rotations
    }

    /// 3D scalings.
    #[inline]
    pub fn scalings(&self) -> &[[f32; 3]] {
        &self.scalings
    }
}

/// Outer property value makers
impl SplatScene {
    /// Making a value for [`SplatScene::opacities`] from a logit.
    #[inline]
    pub fn make_opacity(logit: f32) -> f32 {
        1.0 / (1.0 + (-logit).exp())
    }

    /// Making a value for [`SplatScene::rotations`] from `[x, y, z, w]`.
    ///
    /// Degenerate quaternions become the identity.
    #[inline]
    pub fn make_rotation(rotation: [f32; 4]) -> [f32; 4] {
        let norm = rotation.iter().map(|r| r * r).sum::<f32>().sqrt();
        if !norm.is_finite() || norm < 1e-8 {
            return [0.0, 0.0, 0.0, 1.0];
        }
        rotation.map(|r| r / norm)
    }

    /// Making a value for [`SplatScene::scalings`] from a log-scale.
    #[inline]
    pub fn make_scaling(scaling_log: f32) -> f32 {
        scaling_log.exp()
    }
}

/// Inner property value makers
impl SplatScene {
    /// Making a logit from a value of [`SplatScene::opacities`].
    #[inline]
    pub fn make_inner_opacity(opacity: f32) -> f32 {
        let opacity = opacity.clamp(1e-6, 1.0 - 1e-6);
        (opacity / (1.0 - opacity)).ln()
    }

    /// Making a log-scale from a value of [`SplatScene::scalings`].
    #[inline]
    pub fn make_inner_scaling(scaling: f32) -> f32 {
        scaling.max(1e-30).ln()
    }
}

/// Attribute getters
impl SplatScene {
    /// Whether the scene has higher-order colors.
    #[inline]
    pub fn has_colors_sh_rest(&self) -> bool {
        self.colors_sh_rest.is_some()
    }

    /// The identity of the content.
    #[inline]
    pub fn id(&self) -> SceneId {
        self.id
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// Number of points.
    #[inline]
    pub fn point_count(&self) -> usize {
        let point_count_target = self.positions.len();
        let point_count_other = self.colors_rgb.len();
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.opacities.len();
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.rotations.len();
        debug_assert_eq!(point_count_other, point_count_target);
        let point_count_other = self.scalings.len();
        debug_assert_eq!(point_count_other, point_count_target);

        point_count_target
    }

    /// Size of the properties in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        Self::size_per_point(self.has_colors_sh_rest()) * self.point_count()
    }

    /// Size of the properties of one point in bytes.
    #[inline]
    pub const fn size_per_point(has_colors_sh_rest: bool) -> usize {
        let value_count = 3 + 3 + 1 + 4 + 3;
        let value_count = if has_colors_sh_rest {
            value_count + SH_REST_COUNT
        } else {
            value_count
        };
        value_count * size_of::<f32>()
    }

    /// Estimated GPU bytes of one point while rendering.
    #[inline]
    pub const fn size_gpu_per_point(has_colors_sh_rest: bool) -> usize {
        Self::size_per_point(has_colors_sh_rest) + SIZE_GPU_FRAME_PER_POINT
    }

    /// Estimated GPU bytes of the scene while rendering.
    #[inline]
    pub fn size_gpu(&self) -> usize {
        Self::size_gpu_per_point(self.has_colors_sh_rest()) * self.point_count()
    }

    /// Readable size of the properties.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn make_opacity() {
        use super::*;

        let output = SplatScene::make_opacity(6.0);
        assert!((output - 0.9975274).abs() < 1e-6, "{output}");

        let output = SplatScene::make_opacity(0.0);
        assert_eq!(output, 0.5);

        let output = SplatScene::make_opacity(SplatScene::make_inner_opacity(0.25));
        assert!((output - 0.25).abs() < 1e-6, "{output}");

        let output = SplatScene::make_inner_opacity(1.0);
        assert!(output.is_finite());
    }

    #[test]
    fn make_rotation() {
        use super::*;

        let output = SplatScene::make_rotation([0.0; 4]);
        assert_eq!(output, [0.0, 0.0, 0.0, 1.0]);

        let output = SplatScene::make_rotation([f32::NAN, 0.0, 0.0, 1.0]);
        assert_eq!(output, [0.0, 0.0, 0.0, 1.0]);

        let output = SplatScene::make_rotation([0.0, 0.0, 3.0, 4.0]);
        assert_eq!(output, [0.0, 0.0, 0.6, 0.8]);
    }

    #[test]
    fn make_scaling() {
        use super::*;

        let output = SplatScene::make_scaling(SplatScene::make_inner_scaling(0.01));
        assert!((output - 0.01).abs() < 1e-8, "{output}");

        let output = SplatScene::make_inner_scaling(0.0);
        assert!(output.is_finite());
    }

    #[test]
    fn size() {
        use super::*;

        let source = SplatScene::new(
            vec![[0.0; 3]; 2],
            vec![[1.0; 3]; 2],
            vec![1.0; 2],
            vec![[0.1; 3]; 2],
            vec![[0.0, 0.0, 0.0, 1.0]; 2],
            Some(vec![0.0; 2 * SH_REST_COUNT]),
        )
        .unwrap();

        assert_eq!(source.point_count(), 2);
        assert!(!source.is_empty());
        assert_eq!(source.size(), 2 * (14 + 45) * 4);
        assert!(source.size_readable().ends_with('B'));
        assert_eq!(SplatScene::size_per_point(false), 56);
        assert!(SplatScene::size_gpu_per_point(true) > SplatScene::size_gpu_per_point(false));
        assert_eq!(source.size_gpu(), 2 * SplatScene::size_gpu_per_point(true));
        assert!(source.size_gpu() > source.size());
    }
}
