//! Splat scene export implementation.

pub use super::*;

use crate::polygon::{Element, Format, Header, Property, ScalarKind};
use std::io::{BufWriter, Write};

/// Scene exporters
impl SplatScene {
    /// Export the scene in the splat PLY format.
    ///
    /// The data format is binary little-endian.
    pub fn encode_polygon(
        &self,
        writer: &mut impl Write,
    ) -> Result<(), Error> {
        let writer = &mut BufWriter::new(writer);

        let header = self.header_polygon();
        header.encode(writer)?;

        let stride = header.elements[0].stride();
        let mut record = Vec::with_capacity(stride);
        for index in 0..self.point_count() {
            record.clear();
            let mut put = |value: f32| record.extend(value.to_le_bytes());

            // [3]
            self.positions[index].into_iter().for_each(&mut put);
            // [3] (Unused)
            [0.0; 3].into_iter().for_each(&mut put);
            // [3]
            self.colors_rgb[index].map(encode_dc).into_iter().for_each(&mut put);
            // [3, 15]
            if let Some(colors_sh_rest) = &self.colors_sh_rest {
                colors_sh_rest[index * SH_REST_COUNT..(index + 1) * SH_REST_COUNT]
                    .iter()
                    .copied()
                    .for_each(&mut put);
            }
            // [1]
            put(Self::make_inner_opacity(self.opacities[index]));
            // [3]
            self.scalings[index]
                .map(Self::make_inner_scaling)
                .into_iter()
                .for_each(&mut put);
            // [4] (w, x, y, z) <- (x, y, z, w)
            let [x, y, z, w] = self.rotations[index];
            [w, x, y, z].into_iter().for_each(&mut put);

            writer.write_all(&record)?;
        }

        writer.flush()?;

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::viewer::splat::scene",
            "encode_polygon",
        );

        Ok(())
    }

    /// Export the scene in the splat PLY format into bytes.
    pub fn encode_polygon_to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(self.size() + 1024);
        self.encode_polygon(&mut bytes)?;
        Ok(bytes)
    }

    /// The header of [`SplatScene::encode_polygon`].
    pub fn header_polygon(&self) -> Header {
        let mut names = ["x", "y", "z", "nx", "ny", "nz", "f_dc_0", "f_dc_1", "f_dc_2"]
            .map(String::from)
            .to_vec();
        if self.has_colors_sh_rest() {
            names.extend((0..SH_REST_COUNT).map(|i| format!("f_rest_{i}")));
        }
        names.extend(
            [
                "opacity", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2",
                "rot_3",
            ]
            .map(String::from),
        );

        Header {
            elements: vec![Element {
                count: self.point_count(),
                name: "vertex".into(),
                properties: names
                    .into_iter()
                    .map(|name| Property {
                        kind: ScalarKind::Float32,
                        name,
                    })
                    .collect(),
            }],
            format: Format::BinaryLittleEndian,
        }
    }
}

#[cfg(test)]
mod tests {
    fn assert_scene_approx_eq(
        output: &super::SplatScene,
        target: &super::SplatScene,
    ) {
        fn assert_values_approx_eq<'a>(
            name: &str,
            output: impl IntoIterator<Item = &'a f32>,
            target: impl IntoIterator<Item = &'a f32>,
        ) {
            output
                .into_iter()
                .zip(target)
                .enumerate()
                .for_each(|(index, (o, t))| {
                    assert!((o - t).abs() < 1e-4, "{name}[{index}]: {o} != {t}");
                });
        }

        assert_eq!(output.point_count(), target.point_count());
        assert_values_approx_eq(
            "positions",
            output.positions().as_flattened(),
            target.positions().as_flattened(),
        );
        assert_values_approx_eq(
            "colors_rgb",
            output.colors_rgb().as_flattened(),
            target.colors_rgb().as_flattened(),
        );
        assert_values_approx_eq("opacities", output.opacities(), target.opacities());
        assert_values_approx_eq(
            "rotations",
            output.rotations().as_flattened(),
            target.rotations().as_flattened(),
        );
        assert_values_approx_eq(
            "scalings",
            output.scalings().as_flattened(),
            target.scalings().as_flattened(),
        );
        assert_eq!(output.has_colors_sh_rest(), target.has_colors_sh_rest());
        assert_values_approx_eq(
            "colors_sh_rest",
            output.colors_sh_rest().unwrap_or_default(),
            target.colors_sh_rest().unwrap_or_default(),
        );
    }

    #[test]
    fn encode_and_decode_polygon() {
        use super::*;

        let source = SplatScene::random(100, 0x3D65);
        let bytes = source.encode_polygon_to_vec().unwrap();
        let output = SplatScene::decode_polygon(&bytes).unwrap();

        assert_scene_approx_eq(&output, &source);
        assert_ne!(output.id(), source.id());
    }

    #[test]
    fn encode_and_decode_polygon_with_colors_sh_rest() {
        use super::*;

        let point_count = 3;
        let source = SplatScene::new(
            vec![[0.0, 1.0, 2.0], [-1.0, 0.5, 3.0], [9.0, 8.0, 7.0]],
            vec![[0.0, 0.5, 1.0], [0.25, 0.75, 0.125], [1.0, 1.0, 1.0]],
            vec![0.5, 1.0, 0.0],
            vec![[0.01, 0.02, 0.03], [1.0, 2.0, 0.5], [0.1, 0.1, 0.1]],
            vec![
                [0.0, 0.0, 0.0, 1.0],
                [0.6, 0.0, 0.0, 0.8],
                [0.5, 0.5, 0.5, 0.5],
            ],
            Some(
                (0..point_count * SH_REST_COUNT)
                    .map(|i| i as f32 / 100.0 - 0.5)
                    .collect(),
            ),
        )
        .unwrap();

        let bytes = source.encode_polygon_to_vec().unwrap();
        let output = SplatScene::decode_polygon(&bytes).unwrap();

        // The opacities are clamped before encoding.
        assert!(output.opacities()[1] < 1.0);
        assert!(output.opacities()[2] > 0.0);
        assert_scene_approx_eq(&output, &source);
    }

    #[test]
    fn header_polygon() {
        use super::*;

        let source = SplatScene::random(2, 0);
        let bytes = source.encode_polygon_to_vec().unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with(
            "ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\n"
        ));
        assert!(text.contains("property float nz\nproperty float f_dc_0\n"));
        assert!(text.contains("property float f_dc_2\nproperty float opacity\n"));
        assert!(text.contains("property float rot_3\nend_header\n"));
        assert!(!text.contains("f_rest_0"));

        let (header, payload_start) = Header::decode(&bytes).unwrap();
        assert_eq!(header.elements[0].stride(), 62 * 4 - 45 * 4);
        assert_eq!(bytes.len() - payload_start, 2 * 17 * 4);
    }

    #[test]
    fn encode_empty_scene() {
        use super::*;

        let source = SplatScene::default();
        let bytes = source.encode_polygon_to_vec().unwrap();
        let output = SplatScene::decode_polygon(&bytes).unwrap();
        assert!(output.is_empty());
    }
}
