//! Field resolution and stride reconciliation of the vertex element.

pub use super::header::{Element, Format, ScalarKind};
pub use crate::error::Error;

use crate::spherical_harmonics::SH_REST_COUNT;
use std::collections::HashMap;

/// The record size of the minimal splat layout, which contains
/// `x, y, z, f_dc_0..2, opacity, scale_0..2, rot_0..3` in float.
pub const CANONICAL_STRIDE: usize = 56;

/// Properties that describe a splat.
pub const SEMANTIC_NAMES: [&str; 17] = [
    "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "red", "green", "blue", "opacity",
    "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
];

/// A scalar at a byte offset of the record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub kind: ScalarKind,
    pub offset: usize,
}

/// The source of base colors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColorField {
    /// `f_dc_0..2`
    Harmonic([Field; 3]),
    /// `red`, `green` and `blue`
    Channel([Field; 3]),
}

/// The tagged field-resolution table of the vertex element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    /// `f_rest_0..44` in container order.
    pub colors_sh_rest: Option<Vec<Field>>,
    pub color: Option<ColorField>,
    /// Whether the offsets were reconstructed from the observed stride.
    pub is_packed: bool,
    pub opacity: Option<Field>,
    pub position: [Field; 3],
    /// `rot_0..3`, which is `w, x, y, z`.
    pub rotation: Option<[Field; 4]>,
    pub scaling: Option<[Field; 3]>,
    pub stride: usize,
}

impl Field {
    /// Reading the field of `record`.
    #[inline]
    pub fn read(
        &self,
        record: &[u8],
        format: Format,
    ) -> f32 {
        self.kind.read(&record[self.offset..], format)
    }

    /// The end offset of the field.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.kind.size()
    }
}

impl Layout {
    /// Resolving the fields of `element`, whose records occupy `payload_size` bytes.
    ///
    /// The declared offsets are used when the payload contains complete records.
    /// Otherwise, the offsets are reconstructed from the observed stride.
    pub fn resolve(
        element: &Element,
        payload_size: usize,
    ) -> Result<Self, Error> {
        for name in ["x", "y", "z"] {
            if element.position(name).is_none() {
                return Err(Error::MissingRequiredField(name.into()));
            }
        }

        let stride_declared = element.stride();
        let count = element.count;
        let size_declared = element.size().ok_or_else(|| {
            Error::MalformedContainer(format!(
                "size of element {} overflows ({count} records of {stride_declared} bytes)",
                element.name,
            ))
        })?;
        let stride_observed = if count == 0 {
            stride_declared
        } else {
            payload_size / count
        };

        let (offsets, stride, is_packed) = if stride_observed >= stride_declared {
            (Self::offsets_declared(element), stride_declared, false)
        } else {
            if payload_size % count != 0 {
                return Err(Error::InsufficientData {
                    expected: size_declared,
                    actual: payload_size,
                });
            }

            let offsets = Self::offsets_packed(element, stride_observed);
            log::warn!(
                target: "gausplat::viewer::polygon",
                "recovered layout of {count} records: {stride_observed} bytes per record \
                observed, {stride_declared} bytes declared, {} of {} properties kept",
                offsets.iter().flatten().count(),
                offsets.len(),
            );
            (offsets, stride_observed, true)
        };

        let fields = element
            .properties
            .iter()
            .zip(offsets)
            .filter_map(|(property, offset)| {
                Some((
                    property.name.as_str(),
                    Field {
                        kind: property.kind,
                        offset: offset?,
                    },
                ))
            })
            .collect::<HashMap<_, _>>();
        let find = |name: &str| fields.get(name).copied();
        let find_all = |names: [&str; 3]| -> Option<[Field; 3]> {
            Some([find(names[0])?, find(names[1])?, find(names[2])?])
        };

        let position = find_all(["x", "y", "z"]).ok_or_else(|| {
            Error::InvalidLayout(format!(
                "position does not fit in {stride} bytes per record"
            ))
        })?;

        let color = find_all(["f_dc_0", "f_dc_1", "f_dc_2"])
            .map(ColorField::Harmonic)
            .or_else(|| find_all(["red", "green", "blue"]).map(ColorField::Channel));

        let opacity = find("opacity");

        let scaling = find_all(["scale_0", "scale_1", "scale_2"]);

        let rotation = find_all(["rot_0", "rot_1", "rot_2"])
            .zip(find("rot_3"))
            .map(|([w, x, y], z)| [w, x, y, z]);

        let colors_sh_rest = Self::resolve_colors_sh_rest(element, &fields);

        let layout = Self {
            colors_sh_rest,
            color,
            is_packed,
            opacity,
            position,
            rotation,
            scaling,
            stride,
        };

        // The stride is no more than the declared one.
        let expected = count * layout.stride;
        if payload_size < expected {
            return Err(Error::InsufficientData {
                expected,
                actual: payload_size,
            });
        }

        Ok(layout)
    }

    fn offsets_declared(element: &Element) -> Vec<Option<usize>> {
        element
            .properties
            .iter()
            .scan(0, |offset, property| {
                let start = *offset;
                *offset += property.kind.size();
                Some(Some(start))
            })
            .collect()
    }

    fn offsets_packed(
        element: &Element,
        stride: usize,
    ) -> Vec<Option<usize>> {
        let is_canonical = stride == CANONICAL_STRIDE;
        let mut offset = 0;

        element
            .properties
            .iter()
            .map(|property| {
                let size = property.kind.size();
                let is_semantic = SEMANTIC_NAMES.contains(&property.name.as_str());
                let is_kept = if is_canonical {
                    is_semantic
                } else {
                    is_semantic || offset + size <= stride
                };
                if !is_kept {
                    return None;
                }

                let start = offset;
                offset += size;
                if offset > stride {
                    log::warn!(
                        target: "gausplat::viewer::polygon",
                        "dropped property {} beyond {stride} bytes per record",
                        property.name,
                    );
                    return None;
                }
                Some(start)
            })
            .collect()
    }

    fn resolve_colors_sh_rest(
        element: &Element,
        fields: &HashMap<&str, Field>,
    ) -> Option<Vec<Field>> {
        let start = element.position("f_rest_0");
        let has_any = element
            .properties
            .iter()
            .any(|p| p.name.starts_with("f_rest_"));

        let run = start.and_then(|start| {
            let names = element.properties.get(start..start + SH_REST_COUNT)?;
            names
                .iter()
                .enumerate()
                .map(|(index, property)| {
                    (property.name == format!("f_rest_{index}"))
                        .then(|| fields.get(property.name.as_str()).copied())
                        .flatten()
                })
                .collect::<Option<Vec<_>>>()
        });

        if run.is_none() && has_any {
            log::debug!(
                target: "gausplat::viewer::polygon",
                "ignored incomplete harmonic coefficients",
            );
        }

        run
    }
}

#[cfg(test)]
mod tests {
    use super::super::header::Property;

    fn element(
        count: usize,
        names: &[&str],
    ) -> super::Element {
        super::Element {
            count,
            name: "vertex".into(),
            properties: names
                .iter()
                .map(|name| Property {
                    kind: super::ScalarKind::Float32,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    const NAMES_CANONICAL: [&str; 14] = [
        "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "opacity", "scale_0", "scale_1",
        "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
    ];

    #[test]
    fn resolve_declared() {
        use super::*;

        let source = element(2, &NAMES_CANONICAL);
        let output = Layout::resolve(&source, 2 * CANONICAL_STRIDE).unwrap();

        assert_eq!(output.stride, CANONICAL_STRIDE);
        assert!(!output.is_packed);
        assert_eq!(output.position.map(|f| f.offset), [0, 4, 8]);
        assert_eq!(
            output.color.map(|c| match c {
                ColorField::Harmonic(fields) => fields[0].offset,
                ColorField::Channel(_) => usize::MAX,
            }),
            Some(12)
        );
        assert_eq!(output.opacity.map(|f| f.offset), Some(24));
        assert_eq!(output.rotation.map(|r| r[0].offset), Some(40));
        assert_eq!(output.colors_sh_rest, None);
    }

    #[test]
    fn resolve_by_name_not_by_column() {
        use super::*;

        let source = element(1, &["opacity", "z", "red", "y", "green", "x", "blue"]);
        let output = Layout::resolve(&source, 28).unwrap();

        assert_eq!(output.position.map(|f| f.offset), [20, 12, 4]);
        assert_eq!(
            output.color,
            Some(ColorField::Channel([
                Field {
                    kind: ScalarKind::Float32,
                    offset: 8,
                },
                Field {
                    kind: ScalarKind::Float32,
                    offset: 16,
                },
                Field {
                    kind: ScalarKind::Float32,
                    offset: 24,
                },
            ]))
        );
        assert_eq!(output.opacity.map(|f| f.offset), Some(0));
        assert_eq!(output.scaling, None);
    }

    #[test]
    fn resolve_missing_position() {
        use super::*;

        let source = element(1, &["x", "z"]);
        let output = Layout::resolve(&source, 8);
        assert!(
            matches!(&output, Err(Error::MissingRequiredField(name)) if name == "y"),
            "{output:?}"
        );
    }

    #[test]
    fn resolve_canonical_shim() {
        use super::*;

        let names = [
            &NAMES_CANONICAL[..3],
            &["nx", "ny", "nz"][..],
            &NAMES_CANONICAL[3..],
        ]
        .concat();
        let source = element(3, &names);
        assert_eq!(source.stride(), 68);

        let output = Layout::resolve(&source, 3 * CANONICAL_STRIDE).unwrap();

        assert!(output.is_packed);
        assert_eq!(output.stride, CANONICAL_STRIDE);
        assert_eq!(output.position.map(|f| f.offset), [0, 4, 8]);
        assert!(matches!(
            output.color,
            Some(ColorField::Harmonic([Field { offset: 12, .. }, ..]))
        ));
        assert_eq!(output.opacity.map(|f| f.offset), Some(24));
        assert_eq!(output.scaling.map(|s| s[2].offset), Some(36));
        assert_eq!(output.rotation.map(|r| r[3].offset), Some(52));
    }

    #[test]
    fn resolve_fitting_prefix() {
        use super::*;

        let source = element(4, &["x", "y", "z", "nx", "ny", "nz", "opacity", "extra"]);
        // 6 floats per record
        let output = Layout::resolve(&source, 4 * 24).unwrap();

        assert!(output.is_packed);
        assert_eq!(output.stride, 24);
        assert_eq!(output.position.map(|f| f.offset), [0, 4, 8]);
        // The opacity is semantic but ends beyond the stride.
        assert_eq!(output.opacity, None);
    }

    #[test]
    fn resolve_unplaceable_position() {
        use super::*;

        let source = element(2, &["nx", "ny", "x", "y", "z"]);
        // 2 floats per record
        let output = Layout::resolve(&source, 2 * 8);
        assert!(matches!(output, Err(Error::InvalidLayout(_))), "{output:?}");
    }

    #[test]
    fn resolve_truncated_payload() {
        use super::*;

        let source = element(3, &NAMES_CANONICAL);
        let output = Layout::resolve(&source, 3 * CANONICAL_STRIDE - 5);
        assert!(
            matches!(
                output,
                Err(Error::InsufficientData {
                    expected: 168,
                    actual: 163,
                })
            ),
            "{output:?}"
        );
    }

    #[test]
    fn resolve_colors_sh_rest() {
        use super::*;

        let rest = (0..45).map(|i| format!("f_rest_{i}")).collect::<Vec<_>>();

        let mut names = NAMES_CANONICAL.to_vec();
        names.extend(rest.iter().map(String::as_str));
        let source = element(1, &names);
        let output = Layout::resolve(&source, source.stride()).unwrap();
        let fields = output.colors_sh_rest.unwrap();
        assert_eq!(fields.len(), 45);
        assert_eq!(fields[0].offset, 56);
        assert_eq!(fields[44].offset, 56 + 44 * 4);

        // Incomplete
        let mut names = NAMES_CANONICAL.to_vec();
        names.extend(rest[..44].iter().map(String::as_str));
        let source = element(1, &names);
        let output = Layout::resolve(&source, source.stride()).unwrap();
        assert_eq!(output.colors_sh_rest, None);

        // Out of order
        let mut names = NAMES_CANONICAL.to_vec();
        names.extend(rest.iter().map(String::as_str));
        names.swap(14, 15);
        let source = element(1, &names);
        let output = Layout::resolve(&source, source.stride()).unwrap();
        assert_eq!(output.colors_sh_rest, None);
    }

    #[test]
    fn resolve_empty_element() {
        use super::*;

        let source = element(0, &NAMES_CANONICAL);
        let output = Layout::resolve(&source, 0).unwrap();
        assert_eq!(output.stride, CANONICAL_STRIDE);
        assert!(!output.is_packed);
    }
}
