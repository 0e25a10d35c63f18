//! Plain-text point lists.
//!
//! Each line is `x y z [r g b [opacity]]`.

pub use crate::error::Error;

use std::str;

/// One point of a plain-text point list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextPoint {
    pub color: [f32; 3],
    pub opacity: f32,
    pub position: [f32; 3],
}

impl TextPoint {
    /// Parsing one line. Blank lines and comments yield `None`.
    pub fn parse(
        line: &str,
        line_number: usize,
    ) -> Result<Option<Self>, Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let values = line
            .split_whitespace()
            .map(str::parse::<f32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::MalformedContainer(format!("line {line_number}: {err}"))
            })?;

        if values.len() < 3 {
            return Err(Error::MalformedContainer(format!(
                "line {line_number}: a point should have at least 3 values"
            )));
        }

        let position = [values[0], values[1], values[2]];
        let mut color = [1.0; 3];
        color
            .iter_mut()
            .zip(values.iter().skip(3))
            .for_each(|(channel, &value)| {
                let value = if value > 1.0 { value / 255.0 } else { value };
                *channel = value.clamp(0.0, 1.0);
            });
        let opacity = values.get(6).map_or(1.0, |o| o.clamp(0.0, 1.0));

        Ok(Some(Self {
            color,
            opacity,
            position,
        }))
    }
}

/// Decoding all points of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Vec<TextPoint>, Error> {
    let text = str::from_utf8(bytes).map_err(|err| {
        Error::MalformedContainer(format!("point list is not UTF-8 ({err})"))
    })?;

    let points = text
        .lines()
        .enumerate()
        .filter_map(|(index, line)| TextPoint::parse(line, index + 1).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(Error::MalformedContainer("point list is empty".into()));
    }

    Ok(points)
}
