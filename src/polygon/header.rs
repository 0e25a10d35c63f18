//! Polygon header implementation.

pub use crate::error::Error;

use std::{fmt, io::Write, str};

/// The marker ending the header.
pub const TERMINATOR: &[u8] = b"end_header";

/// The scalar data type of a property.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScalarKind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

/// The byte order of the payload.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Format {
    BinaryBigEndian,
    #[default]
    BinaryLittleEndian,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    pub kind: ScalarKind,
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Element {
    pub count: usize,
    pub name: String,
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    pub elements: Vec<Element>,
    pub format: Format,
}

impl ScalarKind {
    /// Parsing both the legacy and the sized type names.
    pub fn parse(name: &str) -> Option<Self> {
        use ScalarKind::*;

        Some(match name {
            "char" | "int8" => Int8,
            "uchar" | "uint8" => Uint8,
            "short" | "int16" => Int16,
            "ushort" | "uint16" => Uint16,
            "int" | "int32" => Int32,
            "uint" | "uint32" => Uint32,
            "float" | "float32" => Float32,
            "double" | "float64" => Float64,
            _ => return None,
        })
    }

    /// Size in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        use ScalarKind::*;

        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Int32 | Uint32 | Float32 => 4,
            Float64 => 8,
        }
    }

    /// The maximum of an unsigned integer type, used to normalize color channels.
    #[inline]
    pub const fn channel_max(self) -> Option<f32> {
        use ScalarKind::*;

        match self {
            Uint8 => Some(u8::MAX as f32),
            Uint16 => Some(u16::MAX as f32),
            Uint32 => Some(u32::MAX as f32),
            Int8 => Some(i8::MAX as f32),
            Int16 => Some(i16::MAX as f32),
            Int32 => Some(i32::MAX as f32),
            Float32 | Float64 => None,
        }
    }

    /// Reading the scalar at the start of `bytes` as a single-precision float.
    ///
    /// `bytes` should contain at least [`Self::size`] bytes.
    pub fn read(
        self,
        bytes: &[u8],
        format: Format,
    ) -> f32 {
        use ScalarKind::*;

        macro_rules! read {
            ($type: ty) => {{
                const SIZE: usize = size_of::<$type>();
                let mut word = [0; SIZE];
                word.copy_from_slice(&bytes[..SIZE]);
                match format {
                    Format::BinaryBigEndian => <$type>::from_be_bytes(word),
                    Format::BinaryLittleEndian => <$type>::from_le_bytes(word),
                }
            }};
        }

        match self {
            Int8 => read!(i8) as f32,
            Uint8 => read!(u8) as f32,
            Int16 => read!(i16) as f32,
            Uint16 => read!(u16) as f32,
            Int32 => read!(i32) as f32,
            Uint32 => read!(u32) as f32,
            Float32 => read!(f32),
            Float64 => read!(f64) as f32,
        }
    }

    /// The legacy type name, which is the most widely supported.
    pub const fn name(self) -> &'static str {
        use ScalarKind::*;

        match self {
            Int8 => "char",
            Uint8 => "uchar",
            Int16 => "short",
            Uint16 => "ushort",
            Int32 => "int",
            Uint32 => "uint",
            Float32 => "float",
            Float64 => "double",
        }
    }
}

impl Format {
    pub const fn name(self) -> &'static str {
        match self {
            Format::BinaryBigEndian => "binary_big_endian",
            Format::BinaryLittleEndian => "binary_little_endian",
        }
    }
}

impl Element {
    /// Size of one record in bytes implied by the declared properties.
    #[inline]
    pub fn stride(&self) -> usize {
        self.properties.iter().map(|p| p.kind.size()).sum()
    }

    /// Size of all records in bytes, or `None` if it overflows.
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.count.checked_mul(self.stride())
    }

    /// Index of the property named `name`.
    #[inline]
    pub fn position(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

impl Header {
    /// Decoding the header at the start of `bytes`.
    ///
    /// It returns the header and the offset of the first payload byte.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), Error> {
        let (text_end, payload_start) = Self::find_terminator(bytes)?;
        let text = str::from_utf8(&bytes[..text_end]).map_err(|err| {
            Error::MalformedContainer(format!("header is not UTF-8 ({err})"))
        })?;

        let mut lines = text.lines().map(str::trim);
        if lines.next() != Some("ply") {
            return Err(Error::MalformedContainer(
                "header should start with \"ply\"".into(),
            ));
        }

        let mut format = None;
        let mut elements = Vec::<Element>::new();

        for line in lines {
            let words = line.split_whitespace().collect::<Vec<_>>();
            match words.as_slice() {
                [] | ["comment", ..] | ["obj_info", ..] => {},
                ["format", name, version] => {
                    if *version != "1.0" {
                        return Err(Error::MalformedContainer(format!(
                            "unsupported format version {version}"
                        )));
                    }
                    format = Some(match *name {
                        "binary_little_endian" => Format::BinaryLittleEndian,
                        "binary_big_endian" => Format::BinaryBigEndian,
                        _ => {
                            return Err(Error::MalformedContainer(format!(
                                "unsupported format {name}"
                            )))
                        },
                    });
                },
                ["element", name, count] => {
                    let count = count.parse().map_err(|_| {
                        Error::MalformedContainer(format!(
                            "invalid count of element {name}: {count}"
                        ))
                    })?;
                    elements.push(Element {
                        count,
                        name: name.to_string(),
                        properties: vec![],
                    });
                },
                ["property", "list", ..] => {
                    return Err(Error::MalformedContainer(format!(
                        "unsupported list property: {line}"
                    )));
                },
                ["property", kind, name] => {
                    let kind = ScalarKind::parse(kind).ok_or_else(|| {
                        Error::MalformedContainer(format!("unknown scalar type {kind}"))
                    })?;
                    let element = elements.last_mut().ok_or_else(|| {
                        Error::MalformedContainer(format!(
                            "property {name} is outside of any element"
                        ))
                    })?;
                    element.properties.push(Property {
                        kind,
                        name: name.to_string(),
                    });
                },
                _ => {
                    return Err(Error::MalformedContainer(format!(
                        "unknown header line: {line}"
                    )))
                },
            }
        }

        let format = format.ok_or_else(|| {
            Error::MalformedContainer("missing format line".into())
        })?;

        // The payload size must be addressable.
        elements.iter().try_fold(0_usize, |size_total, element| {
            element
                .size()
                .and_then(|size| size_total.checked_add(size))
                .ok_or_else(|| {
                    Error::MalformedContainer(format!(
                        "size of element {} overflows ({} records of {} bytes)",
                        element.name,
                        element.count,
                        element.stride(),
                    ))
                })
        })?;

        Ok((Self { elements, format }, payload_start))
    }

    /// Encoding the header, including the terminator and exactly one newline.
    pub fn encode(
        &self,
        writer: &mut impl Write,
    ) -> Result<(), Error> {
        write!(writer, "{self}")?;
        Ok(())
    }

    /// The element named `name`.
    #[inline]
    pub fn element(
        &self,
        name: &str,
    ) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Byte offset of the element named `name` relative to the payload start.
    pub fn element_offset(
        &self,
        name: &str,
    ) -> Option<usize> {
        let mut offset = 0_usize;
        for element in &self.elements {
            if element.name == name {
                return Some(offset);
            }
            offset = offset.checked_add(element.size()?)?;
        }
        None
    }

    /// Returns `(end of header text, start of payload)`.
    fn find_terminator(bytes: &[u8]) -> Result<(usize, usize), Error> {
        let mut start = 0;
        while let Some(position) = bytes[start..]
            .windows(TERMINATOR.len())
            .position(|window| window == TERMINATOR)
        {
            let position = start + position;
            let end = position + TERMINATOR.len();
            let is_line_start = position > 0 && bytes[position - 1] == b'\n';

            if is_line_start {
                match &bytes[end..] {
                    [b'\n', ..] => return Ok((position, end + 1)),
                    [b'\r', b'\n', ..] => return Ok((position, end + 2)),
                    _ => {},
                }
            }
            start = end;
        }

        Err(Error::MalformedContainer(
            "missing header terminator \"end_header\"".into(),
        ))
    }
}

impl fmt::Display for Header {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "ply")?;
        writeln!(f, "format {} 1.0", self.format.name())?;
        for element in &self.elements {
            writeln!(f, "element {} {}", element.name, element.count)?;
            for property in &element.properties {
                writeln!(f, "property {} {}", property.kind.name(), property.name)?;
            }
        }
        writeln!(f, "{}", str::from_utf8(TERMINATOR).map_err(|_| fmt::Error)?)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn decode_header() {
        use super::*;

        let source = b"ply\r\nformat binary_little_endian 1.0\r\ncomment made by hand\r\n\
            element vertex 2\r\nproperty float x\r\nproperty float32 y\r\nproperty uchar red\r\n\
            end_header\r\n\x01\x02";

        let (header, payload_start) = Header::decode(source).unwrap();
        assert_eq!(header.format, Format::BinaryLittleEndian);
        assert_eq!(&source[payload_start..], b"\x01\x02");

        let vertex = header.element("vertex").unwrap();
        assert_eq!(vertex.count, 2);
        assert_eq!(vertex.stride(), 9);
        assert_eq!(vertex.position("red"), Some(2));
        assert_eq!(vertex.properties[1].kind, ScalarKind::Float32);
    }

    #[test]
    fn decode_header_without_terminator() {
        use super::*;

        let source = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n";
        let output = Header::decode(source);
        assert!(
            matches!(output, Err(Error::MalformedContainer(_))),
            "{output:?}"
        );

        // The marker inside a property name is not a terminator.
        let source = b"ply\nformat binary_little_endian 1.0\nproperty float end_headers\n";
        let output = Header::decode(source);
        assert!(
            matches!(output, Err(Error::MalformedContainer(_))),
            "{output:?}"
        );
    }

    #[test]
    fn decode_header_with_unsupported_lines() {
        use super::*;

        let sources: [&[u8]; 5] = [
            b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n",
            b"ply\nelement vertex 1\nproperty float x\nend_header\n",
            b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
              property list uchar int vertex_indices\nend_header\n",
            b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
              property half x\nend_header\n",
            b"obj\nformat binary_little_endian 1.0\nend_header\n",
        ];

        for source in sources {
            let output = Header::decode(source);
            assert!(
                matches!(output, Err(Error::MalformedContainer(_))),
                "{output:?}"
            );
        }
    }

    #[test]
    fn decode_header_with_overflowing_count() {
        use super::*;

        let source = b"ply\nformat binary_little_endian 1.0\n\
            element vertex 18446744073709551615\nproperty float x\nproperty float y\n\
            property float z\nend_header\n\x00\x01\x02\x03\x04\x05\x06";
        let output = Header::decode(source);
        assert!(
            matches!(output, Err(Error::MalformedContainer(_))),
            "{output:?}"
        );

        // Each element fits but the sum does not.
        let source = b"ply\nformat binary_little_endian 1.0\n\
            element face 4611686018427387904\nproperty uchar flags\n\
            element vertex 4611686018427387904\nproperty float x\nend_header\n";
        let output = Header::decode(source);
        assert!(
            matches!(output, Err(Error::MalformedContainer(_))),
            "{output:?}"
        );

        let source = Element {
            count: usize::MAX,
            name: "vertex".into(),
            properties: vec![Property {
                kind: ScalarKind::Float32,
                name: "x".into(),
            }],
        };
        assert_eq!(source.size(), None);
    }

    #[test]
    fn encode_and_decode_header() {
        use super::*;

        let source = Header {
            elements: vec![
                Element {
                    count: 3,
                    name: "face".into(),
                    properties: vec![Property {
                        kind: ScalarKind::Uint16,
                        name: "flags".into(),
                    }],
                },
                Element {
                    count: 7,
                    name: "vertex".into(),
                    properties: vec![
                        Property {
                            kind: ScalarKind::Float64,
                            name: "x".into(),
                        },
                        Property {
                            kind: ScalarKind::Int8,
                            name: "y".into(),
                        },
                    ],
                },
            ],
            format: Format::BinaryBigEndian,
        };

        let mut bytes = vec![];
        source.encode(&mut bytes).unwrap();
        assert!(bytes.ends_with(b"end_header\n"));

        let (output, payload_start) = Header::decode(&bytes).unwrap();
        assert_eq!(output, source);
        assert_eq!(payload_start, bytes.len());
        assert_eq!(output.element_offset("vertex"), Some(6));
        assert_eq!(output.element_offset("edge"), None);
    }

    #[test]
    fn read_scalar() {
        use super::*;

        let bytes = 1.5_f32.to_le_bytes();
        assert_eq!(ScalarKind::Float32.read(&bytes, Format::BinaryLittleEndian), 1.5);

        let bytes = (-2.25_f64).to_be_bytes();
        assert_eq!(ScalarKind::Float64.read(&bytes, Format::BinaryBigEndian), -2.25);

        let bytes = 300_u16.to_be_bytes();
        assert_eq!(ScalarKind::Uint16.read(&bytes, Format::BinaryBigEndian), 300.0);

        assert_eq!(ScalarKind::Uint8.read(&[255], Format::BinaryLittleEndian), 255.0);
        assert_eq!(ScalarKind::Int8.read(&[0xff], Format::BinaryLittleEndian), -1.0);
    }
}
