pub mod export;
pub mod import;
pub mod load;
pub mod property;
pub mod prune;

pub use crate::{error::Error, spherical_harmonics::*};
pub use load::*;

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

static SCENE_ID_NEXT: AtomicU64 = AtomicU64::new(1);

/// The identity of a scene's content.
///
/// Clones share the identity, and every derived scene receives a new one.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SceneId(u64);

/// A scene of splats in the structure of arrays.
///
/// Every array has [`SplatScene::point_count`] items.
#[derive(Clone)]
pub struct SplatScene {
    /// `[P, 3]`
    colors_rgb: Vec<[f32; 3]>,
    /// `[P, 3, 15]`
    colors_sh_rest: Option<Vec<f32>>,
    id: SceneId,
    /// `[P]`
    opacities: Vec<f32>,
    /// `[P, 3]`
    positions: Vec<[f32; 3]>,
    /// `[P, 4]` (x, y, z, w)
    rotations: Vec<[f32; 4]>,
    /// `[P, 3]`
    scalings: Vec<[f32; 3]>,
}

impl SceneId {
    /// A process-unique identity.
    #[inline]
    pub fn next() -> Self {
        Self(SCENE_ID_NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl SplatScene {
    /// Creating a scene from the outer property values.
    ///
    /// The lengths of all arrays should match,
    /// and `colors_sh_rest` should have `45` values per point if present.
    pub fn new(
        positions: Vec<[f32; 3]>,
        colors_rgb: Vec<[f32; 3]>,
        opacities: Vec<f32>,
        scalings: Vec<[f32; 3]>,
        rotations: Vec<[f32; 4]>,
        colors_sh_rest: Option<Vec<f32>>,
    ) -> Result<Self, Error> {
        let point_count = positions.len();
        let lengths = [
            ("colors_rgb.len()", colors_rgb.len()),
            ("opacities.len()", opacities.len()),
            ("scalings.len()", scalings.len()),
            ("rotations.len()", rotations.len()),
        ];
        for (name, length) in lengths {
            if length != point_count {
                return Err(Error::Validation(
                    format!("{name} ({length})"),
                    point_count.to_string(),
                ));
            }
        }
        if let Some(colors_sh_rest) = &colors_sh_rest {
            let length = colors_sh_rest.len();
            let length_expected = point_count * SH_REST_COUNT;
            if length != length_expected {
                return Err(Error::Validation(
                    format!("colors_sh_rest.len() ({length})"),
                    length_expected.to_string(),
                ));
            }
        }

        Ok(Self {
            colors_rgb,
            colors_sh_rest,
            id: SceneId::next(),
            opacities,
            positions,
            rotations,
            scalings,
        })
    }
}

impl fmt::Debug for SplatScene {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("SplatScene")
            .field("id", &self.id)
            .field("point_count", &self.point_count())
            .field("has_colors_sh_rest", &self.has_colors_sh_rest())
            .field("size", &self.size_readable())
            .finish()
    }
}

impl Default for SplatScene {
    fn default() -> Self {
        Self {
            colors_rgb: vec![],
            colors_sh_rest: None,
            id: SceneId::next(),
            opacities: vec![],
            positions: vec![],
            rotations: vec![],
            scalings: vec![],
        }
    }
}
