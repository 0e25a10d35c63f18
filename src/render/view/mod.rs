pub use crate::error::Error;

/// A view in 3D space.
///
/// The view space is right-handed and the camera looks along `-Z`, with `+Y` up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct View {
    /// The horizontal field of view in radians.
    pub field_of_view_x: f64,
    /// The vertical field of view in radians.
    pub field_of_view_y: f64,
    /// Image height.
    pub image_height: u32,
    /// Image width.
    pub image_width: u32,
    /// Position in world space.
    pub view_position: [f64; 3],
    /// Affine transformation from world space to view space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    ///
    /// # Format
    ///
    /// ```plaintext
    /// [R_v   | T_v]
    /// [...   | ...]
    /// [0 0 0 | 1  ]
    /// ```
    pub view_transform: [[f64; 4]; 4],
}

impl View {
    /// A view at `eye` looking at `target`.
    ///
    /// `field_of_view_y` is in radians,
    /// and the horizontal one follows the aspect ratio.
    pub fn look_at(
        eye: [f64; 3],
        target: [f64; 3],
        up: [f64; 3],
        field_of_view_y: f64,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, Error> {
        let forward = normalize(sub(target, eye)).ok_or_else(|| {
            Error::Validation("look_at > target".into(), "different from eye".into())
        })?;
        let side = normalize(cross(forward, up)).ok_or_else(|| {
            Error::Validation("look_at > up".into(), "not parallel to the forward".into())
        })?;
        let up = cross(side, forward);

        // Rows are side, up and backward.
        let rotation = [
            [side[0], up[0], -forward[0]],
            [side[1], up[1], -forward[1]],
            [side[2], up[2], -forward[2]],
        ];
        let translation = [
            -(side[0] * eye[0] + side[1] * eye[1] + side[2] * eye[2]),
            -(up[0] * eye[0] + up[1] * eye[1] + up[2] * eye[2]),
            forward[0] * eye[0] + forward[1] * eye[1] + forward[2] * eye[2],
        ];

        let aspect_ratio = image_width as f64 / image_height.max(1) as f64;
        let field_of_view_x = 2.0 * ((field_of_view_y / 2.0).tan() * aspect_ratio).atan();

        let view = Self {
            field_of_view_x,
            field_of_view_y,
            image_height,
            image_width,
            view_position: eye,
            view_transform: Self::transform(&rotation, &translation),
        };
        view.validate()?;

        Ok(view)
    }

    /// Checking the dimensions and fields of view.
    pub fn validate(&self) -> Result<(), Error> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::Validation(
                format!("image size ({}x{})", self.image_width, self.image_height),
                "non-zero".into(),
            ));
        }
        for (name, value) in [
            ("field_of_view_x", self.field_of_view_x),
            ("field_of_view_y", self.field_of_view_y),
        ] {
            if !(value > 0.0 && value < std::f64::consts::PI) {
                return Err(Error::Validation(
                    format!("{name} ({value})"),
                    "in (0, pi)".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Linear transformations.
impl View {
    /// Returns the affine transformation matrix.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    #[inline]
    pub const fn transform(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> [[f64; 4]; 4] {
        let r = rotation;
        let t = translation;
        [
            [r[0][0], r[0][1], r[0][2], 0.0],
            [r[1][0], r[1][1], r[1][2], 0.0],
            [r[2][0], r[2][1], r[2][2], 0.0],
            [t[0], t[1], t[2], 1.0],
        ]
    }

    /// Returns the position in world space of the view transformation,
    /// i.e., `-R^T * T`.
    #[inline]
    pub const fn position(view_transform: &[[f64; 4]; 4]) -> [f64; 3] {
        let m = view_transform;
        let t = &m[3];
        [
            -(m[0][0] * t[0] + m[0][1] * t[1] + m[0][2] * t[2]),
            -(m[1][0] * t[0] + m[1][1] * t[1] + m[1][2] * t[2]),
            -(m[2][0] * t[0] + m[2][1] * t[1] + m[2][2] * t[2]),
        ]
    }

    /// The view transformation in single precision.
    #[inline]
    pub fn view_transform_f32(&self) -> [[f32; 4]; 4] {
        self.view_transform.map(|column| column.map(|v| v as f32))
    }
}

/// Dimension operations
impl View {
    /// Returns the aspect ratio (`width / height`).
    #[inline]
    pub const fn aspect_ratio(&self) -> f32 {
        self.image_width as f32 / self.image_height as f32
    }

    /// The focal lengths in pixels, `[f_x, f_y]`.
    #[inline]
    pub fn focal_lengths(&self) -> [f64; 2] {
        [
            self.image_width as f64 / (self.field_of_view_x / 2.0).tan() / 2.0,
            self.image_height as f64 / (self.field_of_view_y / 2.0).tan() / 2.0,
        ]
    }

    /// Resizing the view to the maximum side length of `to`.
    pub fn resize_max(
        &mut self,
        to: u32,
    ) -> &mut Self {
        let ratio = self.aspect_ratio();
        if ratio > 1.0 {
            self.image_width = to;
            self.image_height = (to as f32 / ratio).ceil() as u32;
        } else {
            self.image_width = (to as f32 * ratio).ceil() as u32;
            self.image_height = to;
        }
        self
    }
}

#[inline]
fn sub(
    a: [f64; 3],
    b: [f64; 3],
) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn cross(
    a: [f64; 3],
    b: [f64; 3],
) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    (norm > 1e-12 && norm.is_finite()).then(|| v.map(|v| v / norm))
}

#[cfg(test)]
mod tests {
    #[test]
    fn transform_and_position() {
        use super::*;

        let rotation = [
            [0.9870946659543874, 0.011754269038001336, 0.1597058471183149],
            [
                -0.000481623211642526,
                0.9975159094549839,
                -0.07043989227191047,
            ],
            [-0.1601370927782764, 0.0694539238889973, 0.9846482945564589],
        ];
        let translation = [0.129242027423, 0.0, -0.3424233862];
        let target = [
            [
                0.9870946659543874,
                0.011754269038001336,
                0.1597058471183149,
                0.0000000000000000,
            ],
            [
                -0.000481623211642526,
                0.9975159094549839,
                -0.07043989227191047,
                0.0000000000000000,
            ],
            [
                -0.1601370927782764,
                0.0694539238889973,
                0.9846482945564589,
                0.0000000000000000,
            ],
            [0.129242027423, 0.0, -0.3424233862, 1.0000000000000000],
        ];
        let output = View::transform(&rotation, &translation);
        assert_eq!(output, target);

        // Transforming the position back gives the origin of view space.
        let position = View::position(&output);
        let origin = (0..3)
            .map(|row| {
                (0..3).map(|col| output[col][row] * position[col]).sum::<f64>()
                    + output[3][row]
            })
            .collect::<Vec<_>>();
        origin.iter().for_each(|&o| assert!(o.abs() < 1e-9, "{o}"));
    }

    #[test]
    fn look_at() {
        use super::*;

        let view = View::look_at(
            [0.0, 0.0, 5.0],
            [0.0; 3],
            [0.0, 1.0, 0.0],
            std::f64::consts::FRAC_PI_2,
            200,
            100,
        )
        .unwrap();

        assert_eq!(
            view.view_transform,
            [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, -5.0, 1.0],
            ]
        );
        assert_eq!(View::position(&view.view_transform), [0.0, 0.0, 5.0]);
        assert_eq!(view.view_position, [0.0, 0.0, 5.0]);
        assert!((view.field_of_view_x - 2.0 * 2.0_f64.atan()).abs() < 1e-12);

        let [focal_length_x, focal_length_y] = view.focal_lengths();
        assert!((focal_length_x - 50.0).abs() < 1e-9, "{focal_length_x}");
        assert!((focal_length_y - 50.0).abs() < 1e-9, "{focal_length_y}");
    }

    #[test]
    fn look_at_degenerate() {
        use super::*;

        let output = View::look_at([1.0; 3], [1.0; 3], [0.0, 1.0, 0.0], 1.0, 8, 8);
        assert!(matches!(output, Err(Error::Validation(_, _))), "{output:?}");

        let output = View::look_at([0.0; 3], [0.0, 2.0, 0.0], [0.0, 1.0, 0.0], 1.0, 8, 8);
        assert!(matches!(output, Err(Error::Validation(_, _))), "{output:?}");

        let output = View::look_at([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], 1.0, 0, 8);
        assert!(matches!(output, Err(Error::Validation(_, _))), "{output:?}");
    }

    #[test]
    fn resize_max() {
        use super::*;

        let mut view = View {
            image_width: 1920,
            image_height: 1080,
            ..Default::default()
        };
        view.resize_max(1080);
        assert_eq!(view.image_width, 1080);
        assert_eq!(view.image_height, 608);
        assert!((view.aspect_ratio() - 1080.0 / 608.0).abs() < 1e-6);

        let mut view = View {
            image_width: 720,
            image_height: 1080,
            ..Default::default()
        };
        view.resize_max(1080);
        assert_eq!(view.image_width, 720);
        assert_eq!(view.image_height, 1080);
    }
}
