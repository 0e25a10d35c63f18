//! Splat scene import implementation.

pub use super::*;

use crate::polygon::{self, ColorField, Layout};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{LogNormal, StandardNormal};
use rayon::prelude::*;
use std::{fs, path::Path};

/// Scene importers
impl SplatScene {
    /// Import the scene from a container or a plain-text point list.
    ///
    /// Bytes starting with `ply` are decoded as a container.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.starts_with(b"ply") {
            Self::decode_polygon(bytes)
        } else {
            Self::decode_text(bytes)
        }
    }

    /// Import the scene from the file at `path`.
    pub fn decode_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::decode(&fs::read(path)?)
    }

    /// Import the scene in the splat PLY format.
    ///
    /// The record layout is reconciled with the payload size,
    /// see [`Layout::resolve`].
    pub fn decode_polygon(bytes: &[u8]) -> Result<Self, Error> {
        let (header, payload_start) = polygon::Header::decode(bytes)?;
        let element = header.element("vertex").ok_or_else(|| {
            Error::MalformedContainer("missing element vertex".into())
        })?;
        let format = header.format;

        // The elements before the vertex are skipped,
        // and the elements after the vertex are reserved.
        let payload = &bytes[payload_start..];
        let element_offset = header.element_offset("vertex").unwrap_or_default();
        if payload.len() < element_offset {
            return Err(Error::InsufficientData {
                expected: element_offset,
                actual: payload.len(),
            });
        }
        let payload_size_after = header
            .elements
            .iter()
            .skip_while(|e| e.name != "vertex")
            .skip(1)
            .filter_map(|e| e.size())
            .fold(0, usize::saturating_add);
        let payload = &payload[element_offset..];
        let payload = &payload[..payload.len().saturating_sub(payload_size_after)];

        let layout = Layout::resolve(element, payload.len())?;
        let point_count = element.count;
        let records = &payload[..point_count * layout.stride];
        let stride = layout.stride;

        // [P, 3]
        let positions = decode_records(records, stride, |record| {
            layout.position.map(|field| field.read(record, format))
        });

        // [P, 3]
        let colors_rgb = decode_records(records, stride, |record| match layout.color {
            Some(ColorField::Harmonic(fields)) => {
                fields.map(|field| decode_dc(field.read(record, format)).clamp(0.0, 1.0))
            },
            Some(ColorField::Channel(fields)) => fields.map(|field| {
                let value = field.read(record, format);
                let value = field.kind.channel_max().map_or(value, |max| value / max);
                value.clamp(0.0, 1.0)
            }),
            None => [1.0; 3],
        });

        // [P]
        let opacities = decode_records(records, stride, |record| {
            layout
                .opacity
                .map_or(1.0, |field| Self::make_opacity(field.read(record, format)))
        });

        // [P, 4] (x, y, z, w) <- (w, x, y, z)
        let rotations = decode_records(records, stride, |record| {
            layout.rotation.map_or([0.0, 0.0, 0.0, 1.0], |fields| {
                let [w, x, y, z] = fields.map(|field| field.read(record, format));
                Self::make_rotation([x, y, z, w])
            })
        });

        // [P, 3]
        let scalings = decode_records(records, stride, |record| {
            layout.scaling.map_or([0.01; 3], |fields| {
                fields.map(|field| Self::make_scaling(field.read(record, format)))
            })
        });

        // [P, 3, 15]
        let colors_sh_rest = layout.colors_sh_rest.as_ref().map(|fields| {
            records
                .par_chunks_exact(stride)
                .flat_map_iter(|record| fields.iter().map(|field| field.read(record, format)))
                .collect::<Vec<_>>()
        });

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::viewer::splat::scene",
            "decode_polygon > {point_count} points",
        );

        Self::new(
            positions,
            colors_rgb,
            opacities,
            scalings,
            rotations,
            colors_sh_rest,
        )
    }

    /// Import the scene from a plain-text point list.
    ///
    /// The scalings are `0.01` and the rotations are the identity.
    pub fn decode_text(bytes: &[u8]) -> Result<Self, Error> {
        let points = polygon::text::decode(bytes)?;
        let point_count = points.len();

        let (positions, (colors_rgb, opacities)): (Vec<_>, (Vec<_>, Vec<_>)) = points
            .into_iter()
            .map(|point| (point.position, (point.color, point.opacity)))
            .unzip();

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "gausplat::viewer::splat::scene",
            "decode_text > {point_count} points",
        );

        Self::new(
            positions,
            colors_rgb,
            opacities,
            vec![[0.01; 3]; point_count],
            vec![[0.0, 0.0, 0.0, 1.0]; point_count],
            None,
        )
    }

    /// A seeded random scene in the unit cube.
    pub fn random(
        point_count: usize,
        seed: u64,
    ) -> Self {
        let rng = &mut StdRng::seed_from_u64(seed);

        // [P, 3]
        let positions = (0..point_count)
            .map(|_| [(); 3].map(|_| rng.gen_range(-1.0..1.0)))
            .collect();

        // [P, 3]
        let colors_rgb = (0..point_count)
            .map(|_| [(); 3].map(|_| rng.gen_range(0.0..=1.0)))
            .collect();

        // [P]
        let opacities = (0..point_count).map(|_| rng.gen_range(0.05..=1.0)).collect();

        // [P, 4] (x, y, z, w)
        let rotations = (0..point_count)
            .map(|_| Self::make_rotation([(); 4].map(|_| rng.sample(StandardNormal))))
            .collect();

        // [P, 3]
        let scalings = {
            let distribution = LogNormal::new(0.0, std::f32::consts::E)
                .expect("The standard deviation is finite");
            let mut sample_max = f32::EPSILON;
            let samples = (0..point_count)
                .map(|_| {
                    let sample = rng.sample(distribution).max(f32::EPSILON);
                    sample_max = sample_max.max(sample);
                    sample
                })
                .collect::<Vec<_>>();
            samples
                .into_iter()
                .map(|sample| {
                    let scaling = (sample / sample_max).sqrt().max(1e-3) * 0.05;
                    [scaling; 3]
                })
                .collect()
        };

        Self {
            colors_rgb,
            colors_sh_rest: None,
            id: SceneId::next(),
            opacities,
            positions,
            rotations,
            scalings,
        }
    }
}

/// Decoding every record of `records` in parallel.
fn decode_records<T: Send>(
    records: &[u8],
    stride: usize,
    decode: impl Fn(&[u8]) -> T + Send + Sync,
) -> Vec<T> {
    records.par_chunks_exact(stride).map(decode).collect()
}
