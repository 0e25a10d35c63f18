//! Projecting splats from world space onto screen space.

pub use super::*;

use crate::spherical_harmonics::color_rest;

/// The nearest depth of visible points.
pub const DEPTH_MIN: f32 = 0.2;
/// $ c_f $, the variance added to the 2D covariance.
pub const FILTER_LOW_PASS: f32 = 0.3;
/// The minimum opacity of a visible fragment.
pub const OPACITY_MIN: f32 = 1.0 / 255.0;
/// The factor of the view bounds to the tangents of half field of view.
pub const VIEW_BOUND_FACTOR: f32 = 1.3;
/// $ k $, the radius in standard deviations.
pub const RADIUS_FACTOR: f32 = 3.0;
/// $ t_x $
pub const TILE_SIZE_X: u32 = 16;
/// $ t_y $
pub const TILE_SIZE_Y: u32 = 16;
/// Maximum of `(I_y / T_y) * (I_x / T_x)`, which fits in a 16-bit key.
pub const TILE_COUNT_MAX: u32 = 1 << 16;

/// The per-frame parameters of projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
    pub colors_sh_degree_max: u32,
    pub focal_length_x: f32,
    pub focal_length_y: f32,
    pub image_size_half_x: f32,
    pub image_size_half_y: f32,
    pub image_size_x: u32,
    pub image_size_y: u32,
    pub splat_scale: f32,
    pub tile_count_x: u32,
    pub tile_count_y: u32,
    pub view_bound_x: f32,
    pub view_bound_y: f32,
    pub view_position: [f32; 3],
    /// Column-major
    pub view_transform: [[f32; 4]; 4],
}

/// A splat on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Projected {
    /// The graded color and opacity.
    pub color_rgba: [f32; 4],
    /// The inverse of the 2D covariance, `[a, b, c]` of `[[a, b], [b, c]]`.
    pub conic: [f32; 3],
    /// The center in pixels.
    pub position_2d: [f32; 2],
    /// The radius in pixels, which is positive.
    pub radius: u32,
    /// `[x_min, y_min, x_max, y_max)` in tiles.
    pub tile_bounds: [u32; 4],
}

impl Projector {
    pub fn new(
        view: &View,
        options: &RenderOptions,
    ) -> Result<Self, Error> {
        view.validate()?;
        options.validate()?;

        // I_x
        let image_size_x = view.image_width;
        // I_y
        let image_size_y = view.image_height;
        // I_x / T_x
        let tile_count_x = image_size_x.div_ceil(TILE_SIZE_X);
        // I_y / T_y
        let tile_count_y = image_size_y.div_ceil(TILE_SIZE_Y);
        if tile_count_x as u64 * tile_count_y as u64 > TILE_COUNT_MAX as u64 {
            return Err(Error::Validation(
                format!("tile count ({tile_count_x}x{tile_count_y})"),
                format!("no more than {TILE_COUNT_MAX}"),
            ));
        }

        // tan(Fov_x / 2)
        let field_of_view_x_half_tan = (view.field_of_view_x / 2.0).tan();
        // tan(Fov_y / 2)
        let field_of_view_y_half_tan = (view.field_of_view_y / 2.0).tan();
        let [focal_length_x, focal_length_y] = view.focal_lengths();

        Ok(Self {
            colors_sh_degree_max: options.colors_sh_degree_max,
            focal_length_x: focal_length_x as f32,
            focal_length_y: focal_length_y as f32,
            image_size_half_x: (image_size_x as f64 / 2.0) as f32,
            image_size_half_y: (image_size_y as f64 / 2.0) as f32,
            image_size_x,
            image_size_y,
            splat_scale: options.splat_scale,
            tile_count_x,
            tile_count_y,
            view_bound_x: (field_of_view_x_half_tan * VIEW_BOUND_FACTOR as f64) as f32,
            view_bound_y: (field_of_view_y_half_tan * VIEW_BOUND_FACTOR as f64) as f32,
            view_position: View::position(&view.view_transform).map(|v| v as f32),
            view_transform: view.view_transform_f32(),
        })
    }

    /// Number of tiles.
    #[inline]
    pub const fn tile_count(&self) -> u32 {
        self.tile_count_x * self.tile_count_y
    }

    /// The position in view space.
    #[inline]
    pub fn position_view(
        &self,
        position: &[f32; 3],
    ) -> [f32; 3] {
        let m = &self.view_transform;
        [0, 1, 2].map(|row| {
            m[0][row] * position[0] + m[1][row] * position[1] + m[2][row] * position[2]
                + m[3][row]
        })
    }

    /// Projecting a splat.
    ///
    /// It returns `None` if the splat is culled.
    #[allow(clippy::too_many_arguments)]
    pub fn project(
        &self,
        position: &[f32; 3],
        color_rgb: &[f32; 3],
        colors_sh_rest: Option<&[f32]>,
        opacity: f32,
        rotation: &[f32; 4],
        scaling: &[f32; 3],
    ) -> Option<Projected> {
        let [x, y, z] = self.position_view(position);
        let depth = -z;
        if !(depth > DEPTH_MIN) {
            return None;
        }

        // Covariance in world space
        let scaling = scaling.map(|s| s * self.splat_scale);
        let covariance_3d = covariance_3d(rotation, &scaling);

        // Jacobian of the projection at the clamped position
        let x_clamped = (x / depth).clamp(-self.view_bound_x, self.view_bound_x) * depth;
        let y_clamped = (y / depth).clamp(-self.view_bound_y, self.view_bound_y) * depth;
        let depth_inv = 1.0 / depth;
        let depth_inv_2 = depth_inv * depth_inv;
        let jacobian = [
            [self.focal_length_x * depth_inv, 0.0, self.focal_length_x * x_clamped * depth_inv_2],
            [0.0, -self.focal_length_y * depth_inv, -self.focal_length_y * y_clamped * depth_inv_2],
        ];

        // T = J W
        let m = &self.view_transform;
        let transform = jacobian.map(|j| {
            [0, 1, 2].map(|col| j[0] * m[col][0] + j[1] * m[col][1] + j[2] * m[col][2])
        });

        // Σ' = T Σ T^T + c_f I
        let t_sigma = transform.map(|t| {
            [0, 1, 2].map(|col| {
                t[0] * covariance_3d[0][col]
                    + t[1] * covariance_3d[1][col]
                    + t[2] * covariance_3d[2][col]
            })
        });
        let dot = |a: &[f32; 3], b: &[f32; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        let a = dot(&t_sigma[0], &transform[0]) + FILTER_LOW_PASS;
        let b = dot(&t_sigma[0], &transform[1]);
        let c = dot(&t_sigma[1], &transform[1]) + FILTER_LOW_PASS;

        let det = a * c - b * b;
        if !(det > 0.0) {
            return None;
        }
        let det_inv = 1.0 / det;
        let conic = [c * det_inv, -b * det_inv, a * det_inv];

        let mid = 0.5 * (a + c);
        let eigenvalue_max = mid + (mid * mid - det).max(0.1).sqrt();
        let radius = (RADIUS_FACTOR * eigenvalue_max.sqrt()).ceil();
        if !(radius >= 1.0 && radius.is_finite()) {
            return None;
        }
        let radius = radius as u32;

        let position_2d = [
            self.focal_length_x * x * depth_inv + self.image_size_half_x,
            -self.focal_length_y * y * depth_inv + self.image_size_half_y,
        ];
        let tile_bounds = self.tile_bounds(&position_2d, radius);

        let mut color = *color_rgb;
        if let Some(colors_sh_rest) =
            colors_sh_rest.filter(|_| self.colors_sh_degree_max > 0)
        {
            let direction = [0, 1, 2].map(|i| position[i] - self.view_position[i]);
            let norm = direction.iter().map(|d| d * d).sum::<f32>().sqrt();
            if norm > 0.0 {
                let direction = direction.map(|d| d / norm);
                let offset = color_rest(colors_sh_rest, direction, self.colors_sh_degree_max);
                color = [0, 1, 2].map(|i| color[i] + offset[i]);
            }
        }
        let color = color.map(|c| c.clamp(0.0, 1.0));

        Some(Projected {
            color_rgba: [color[0], color[1], color[2], opacity],
            conic,
            position_2d,
            radius,
            tile_bounds,
        })
    }

    /// `[x_min, y_min, x_max, y_max)` of the tiles touched by the square footprint.
    pub fn tile_bounds(
        &self,
        position_2d: &[f32; 2],
        radius: u32,
    ) -> [u32; 4] {
        let radius = radius as f32;
        let bound = |value: f32, size: u32, count: u32| {
            (value / size as f32).clamp(0.0, count as f32) as u32
        };
        [
            bound(position_2d[0] - radius, TILE_SIZE_X, self.tile_count_x),
            bound(position_2d[1] - radius, TILE_SIZE_Y, self.tile_count_y),
            bound(
                position_2d[0] + radius + (TILE_SIZE_X - 1) as f32,
                TILE_SIZE_X,
                self.tile_count_x,
            ),
            bound(
                position_2d[1] + radius + (TILE_SIZE_Y - 1) as f32,
                TILE_SIZE_Y,
                self.tile_count_y,
            ),
        ]
    }
}

impl Projected {
    /// Number of tiles touched.
    #[inline]
    pub fn tile_touched_count(&self) -> u32 {
        let [x_min, y_min, x_max, y_max] = self.tile_bounds;
        (x_max - x_min) * (y_max - y_min)
    }

    /// The opacity of the fragment at the pixel center `(x, y)`.
    ///
    /// It returns `None` if the fragment is invisible.
    #[inline]
    pub fn alpha(
        &self,
        x: f32,
        y: f32,
    ) -> Option<f32> {
        let offset_x = self.position_2d[0] - x;
        let offset_y = self.position_2d[1] - y;
        let radius = self.radius as f32;
        if offset_x.abs() > radius || offset_y.abs() > radius {
            return None;
        }

        let [a, b, c] = self.conic;
        let power = -0.5 * (a * offset_x * offset_x + c * offset_y * offset_y)
            - b * offset_x * offset_y;
        if power > 0.0 {
            return None;
        }

        let alpha = (self.color_rgba[3] * power.exp()).min(1.0);
        (alpha >= OPACITY_MIN).then_some(alpha)
    }
}

/// The depth key of a position, i.e., `z` in view space as an ordered integer.
#[inline]
pub fn depth_key(
    view_transform: &[[f32; 4]; 4],
    position: &[f32; 3],
) -> u32 {
    let m = view_transform;
    encode_depth(m[0][2] * position[0] + m[1][2] * position[1] + m[2][2] * position[2] + m[3][2])
}

/// Encoding a float into an integer of the same order.
#[inline]
pub fn encode_depth(depth: f32) -> u32 {
    let bits = depth.to_bits();
    bits ^ if bits >> 31 == 1 { 0xFFFF_FFFF } else { 0x8000_0000 }
}

/// $ \Sigma = R S S^T R^T $
///
/// The rotation is `[x, y, z, w]`.
pub fn covariance_3d(
    rotation: &[f32; 4],
    scaling: &[f32; 3],
) -> [[f32; 3]; 3] {
    let [x, y, z, w] = *rotation;
    let rotation = [
        [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z), 2.0 * (x * z + w * y)],
        [2.0 * (x * y + w * z), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x)],
        [2.0 * (x * z - w * y), 2.0 * (y * z + w * x), 1.0 - 2.0 * (x * x + y * y)],
    ];
    // M = R S
    let m = rotation.map(|row| [0, 1, 2].map(|col| row[col] * scaling[col]));
    // M M^T
    [0, 1, 2].map(|i| {
        [0, 1, 2].map(|j| m[i][0] * m[j][0] + m[i][1] * m[j][1] + m[i][2] * m[j][2])
    })
}
