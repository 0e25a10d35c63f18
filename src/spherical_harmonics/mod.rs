use std::{f64::consts::PI, sync::LazyLock};

/// The count of spherical harmonics coefficients per channel
pub const SH_COUNT_MAX: usize = (SH_DEGREE_MAX as usize + 1).pow(2);

/// The maximum degree of spherical harmonics
pub const SH_DEGREE_MAX: u32 = 3;

/// The count of higher-order coefficients of all three channels,
/// i.e., `3 * (SH_COUNT_MAX - 1)`.
pub const SH_REST_COUNT: usize = 3 * (SH_COUNT_MAX - 1);

/// The coefficient of the zeroth-degree term in single precision.
pub const SH_C0: f32 = 0.28209479177387814;

/// The real coefficients of orthonormalized spherical harmonics from degree 0 to 3
///
/// ## Examples
///
/// ```rust
/// use gausplat_viewer::spherical_harmonics::SH_COEF;
///
/// assert_eq!(SH_COEF.0[0], 0.28209479177387814);
/// assert_eq!(SH_COEF.3[3 + 2], 1.445305721320277);
/// ```
#[allow(clippy::type_complexity)]
pub static SH_COEF: LazyLock<([f64; 1], [f64; 3], [f64; 5], [f64; 7])> =
    LazyLock::new(|| {
        (
            [(1.0 / 4.0 / PI).sqrt()],
            [
                -(3.0 / 4.0 / PI).sqrt(),
                (3.0 / 4.0 / PI).sqrt(),
                -(3.0 / 4.0 / PI).sqrt(),
            ],
            [
                (15.0 / 4.0 / PI).sqrt(),
                -(15.0 / 4.0 / PI).sqrt(),
                (5.0 / 16.0 / PI).sqrt(),
                -(15.0 / 4.0 / PI).sqrt(),
                (15.0 / 16.0 / PI).sqrt(),
            ],
            [
                -(35.0 / 32.0 / PI).sqrt(),
                (105.0 / 4.0 / PI).sqrt(),
                -(21.0 / 32.0 / PI).sqrt(),
                (7.0 / 16.0 / PI).sqrt(),
                -(21.0 / 32.0 / PI).sqrt(),
                (105.0 / 16.0 / PI).sqrt(),
                -(35.0 / 32.0 / PI).sqrt(),
            ],
        )
    });

/// Decoding the zeroth-degree coefficient into a color channel.
#[inline]
pub fn decode_dc(dc: f32) -> f32 {
    0.5 + SH_C0 * dc
}

/// Encoding a color channel into the zeroth-degree coefficient.
#[inline]
pub fn encode_dc(color: f32) -> f32 {
    (color - 0.5) / SH_C0
}

/// The basis values of degree 1 to `degree_max` along the direction.
///
/// The direction should be normalized.
/// Terms above `degree_max` are zero.
pub fn basis_rest(
    direction: [f32; 3],
    degree_max: u32,
) -> [f32; SH_COUNT_MAX - 1] {
    let coef = &*SH_COEF;
    let [x, y, z] = direction.map(f64::from);
    let mut basis = [0.0; SH_COUNT_MAX - 1];

    if degree_max >= 1 {
        basis[0] = (coef.1[0] * y) as f32;
        basis[1] = (coef.1[1] * z) as f32;
        basis[2] = (coef.1[2] * x) as f32;
    }

    if degree_max >= 2 {
        let (xx, yy, zz) = (x * x, y * y, z * z);
        basis[3] = (coef.2[0] * x * y) as f32;
        basis[4] = (coef.2[1] * y * z) as f32;
        basis[5] = (coef.2[2] * (2.0 * zz - xx - yy)) as f32;
        basis[6] = (coef.2[3] * x * z) as f32;
        basis[7] = (coef.2[4] * (xx - yy)) as f32;

        if degree_max >= 3 {
            basis[8] = (coef.3[0] * y * (3.0 * xx - yy)) as f32;
            basis[9] = (coef.3[1] * x * y * z) as f32;
            basis[10] = (coef.3[2] * y * (4.0 * zz - xx - yy)) as f32;
            basis[11] = (coef.3[3] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy)) as f32;
            basis[12] = (coef.3[4] * x * (4.0 * zz - xx - yy)) as f32;
            basis[13] = (coef.3[5] * z * (xx - yy)) as f32;
            basis[14] = (coef.3[6] * x * (xx - 3.0 * yy)) as f32;
        }
    }

    basis
}

/// The view-dependent color offset of one point.
///
/// `colors_sh_rest` is channel-major, i.e., `[3, SH_COUNT_MAX - 1]`,
/// which is the order of `f_rest_*` properties in the container.
pub fn color_rest(
    colors_sh_rest: &[f32],
    direction: [f32; 3],
    degree_max: u32,
) -> [f32; 3] {
    debug_assert_eq!(colors_sh_rest.len(), SH_REST_COUNT);

    let basis = basis_rest(direction, degree_max);
    let mut color = [0.0; 3];
    colors_sh_rest
        .chunks_exact(SH_COUNT_MAX - 1)
        .zip(&mut color)
        .for_each(|(coefficients, channel)| {
            *channel = coefficients.iter().zip(&basis).map(|(c, b)| c * b).sum();
        });
    color
}

#[cfg(test)]
mod tests {
    #[test]
    fn decode_dc_of_zero_is_mid_gray() {
        use super::*;

        assert_eq!([0.0, 0.0, 0.0].map(decode_dc), [0.5, 0.5, 0.5]);
    }

    #[test]
    fn encode_and_decode_red() {
        use super::*;

        let output = [1.0, 0.0, 0.0].map(encode_dc).map(decode_dc);
        assert!(output[0] > 0.8, "red: {}", output[0]);
        assert!(output[1] < 0.2, "green: {}", output[1]);
        assert!(output[2] < 0.2, "blue: {}", output[2]);
    }

    #[test]
    fn basis_rest_by_degree() {
        use super::*;

        let direction = [0.0, 0.0, 1.0];

        let output = basis_rest(direction, 0);
        assert_eq!(output, [0.0; 15]);

        let output = basis_rest(direction, 1);
        assert_eq!(output[1], SH_COEF.1[1] as f32);
        assert!(output[3..].iter().all(|&b| b == 0.0));

        let output = basis_rest(direction, 3);
        assert_eq!(output[5], (SH_COEF.2[2] * 2.0) as f32);
        assert_eq!(output[11], (SH_COEF.3[3] * 2.0) as f32);
    }

    #[test]
    fn color_rest_is_channel_major() {
        use super::*;

        let mut colors_sh_rest = vec![0.0; SH_REST_COUNT];
        // The first degree-1 term of green
        colors_sh_rest[SH_COUNT_MAX - 1] = 1.0;

        let output = color_rest(&colors_sh_rest, [0.0, 1.0, 0.0], 3);
        assert_eq!(output[0], 0.0);
        assert_eq!(output[1], SH_COEF.1[0] as f32);
        assert_eq!(output[2], 0.0);
    }
}
