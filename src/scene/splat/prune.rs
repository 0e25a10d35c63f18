//! Splat scene pruning implementation.

pub use super::*;

use rayon::prelude::*;

/// Weight of the opacity score.
pub const SCORE_WEIGHT_OPACITY: f32 = 0.5;

/// Weight of the scale score.
pub const SCORE_WEIGHT_SCALE: f32 = 0.3;

/// Weight of the spatial score.
pub const SCORE_WEIGHT_SPATIAL: f32 = 0.2;

/// Distance to the centroid at which the spatial score vanishes.
pub const SPATIAL_DISTANCE_MAX: f32 = 50.0;

/// Scene pruners
impl SplatScene {
    /// Keeping at most `point_count_max` points of the highest quality.
    ///
    /// The scene is returned as-is if it has no more than `point_count_max` points.
    /// Otherwise, a new scene is made of the kept points in descending score order.
    pub fn prune(
        self,
        point_count_max: usize,
    ) -> Self {
        let point_count = self.point_count();
        if point_count <= point_count_max {
            return self;
        }

        let scores = self.score_points();
        let mut indices = (0..point_count).collect::<Vec<_>>();
        indices.par_sort_unstable_by(|&a, &b| {
            scores[b].total_cmp(&scores[a]).then(a.cmp(&b))
        });
        indices.truncate(point_count_max);

        let positions = indices.iter().map(|&i| self.positions[i]).collect();
        let colors_rgb = indices.iter().map(|&i| self.colors_rgb[i]).collect();
        let opacities = indices.iter().map(|&i| self.opacities[i]).collect();
        let rotations = indices.iter().map(|&i| self.rotations[i]).collect();
        let scalings = indices.iter().map(|&i| self.scalings[i]).collect();
        let colors_sh_rest = self.colors_sh_rest.as_ref().map(|colors_sh_rest| {
            indices
                .iter()
                .flat_map(|&i| &colors_sh_rest[i * SH_REST_COUNT..(i + 1) * SH_REST_COUNT])
                .copied()
                .collect()
        });

        log::info!(
            target: "gausplat::viewer::splat::scene",
            "pruned {point_count} points to {point_count_max} points",
        );

        Self {
            colors_rgb,
            colors_sh_rest,
            id: SceneId::next(),
            opacities,
            positions,
            rotations,
            scalings,
        }
    }

    /// The quality score of each point.
    ///
    /// It is a weighted sum of the opacity, scale and spatial scores.
    pub fn score_points(&self) -> Vec<f32> {
        let centroid = self.centroid();

        self.positions
            .par_iter()
            .zip(&self.opacities)
            .zip(&self.scalings)
            .map(|((position, &opacity), scaling)| {
                let distance = position
                    .iter()
                    .zip(centroid)
                    .map(|(p, c)| (p - c).powi(2))
                    .sum::<f32>()
                    .sqrt();

                SCORE_WEIGHT_OPACITY * opacity
                    + SCORE_WEIGHT_SCALE * score_scale(scaling)
                    + SCORE_WEIGHT_SPATIAL * score_spatial(distance)
            })
            .collect()
    }

    /// The mean of positions.
    pub fn centroid(&self) -> [f32; 3] {
        let point_count = self.point_count();
        if point_count == 0 {
            return [0.0; 3];
        }

        let sum = self
            .positions
            .par_iter()
            .map(|position| position.map(f64::from))
            .reduce(|| [0.0; 3], |a, b| [a[0] + b[0], a[1] + b[1], a[2] + b[2]]);

        sum.map(|s| (s / point_count as f64) as f32)
    }
}

/// The scale score by the mean scaling.
#[inline]
pub fn score_scale(scaling: &[f32; 3]) -> f32 {
    let mean = scaling.iter().sum::<f32>() / 3.0;
    if mean < 0.001 {
        0.1
    } else if mean > 10.0 {
        0.2
    } else if (0.01..=1.0).contains(&mean) {
        1.0
    } else {
        0.5
    }
}

/// The spatial score by the distance to the centroid.
#[inline]
pub fn score_spatial(distance: f32) -> f32 {
    (1.0 - distance / SPATIAL_DISTANCE_MAX).max(0.0)
}

#[cfg(test)]
mod tests {
    fn scene(opacities: Vec<f32>) -> super::SplatScene {
        let point_count = opacities.len();
        super::SplatScene::new(
            vec![[0.0; 3]; point_count],
            (0..point_count).map(|i| [i as f32 / 10.0; 3]).collect(),
            opacities,
            vec![[0.1; 3]; point_count],
            vec![[0.0, 0.0, 0.0, 1.0]; point_count],
            Some(
                (0..point_count * super::SH_REST_COUNT)
                    .map(|i| i as f32)
                    .collect(),
            ),
        )
        .unwrap()
    }

    #[test]
    fn prune_by_opacity() {
        use super::*;

        let source = scene(vec![0.9, 0.5, 0.1, 0.95]);
        let source_id = source.id();
        let output = source.prune(2);

        assert_eq!(output.point_count(), 2);
        assert_eq!(output.opacities(), &[0.95, 0.9]);
        assert_eq!(output.colors_rgb(), &[[0.3; 3], [0.0; 3]]);
        let colors_sh_rest = output.colors_sh_rest().unwrap();
        assert_eq!(colors_sh_rest.len(), 2 * SH_REST_COUNT);
        assert_eq!(colors_sh_rest[0], (3 * SH_REST_COUNT) as f32);
        assert_eq!(colors_sh_rest[SH_REST_COUNT], 0.0);
        assert_ne!(output.id(), source_id);
    }

    #[test]
    fn prune_under_limit() {
        use super::*;

        let source = scene(vec![0.9, 0.5]);
        let source_id = source.id();

        let output = source.prune(2);
        assert_eq!(output.point_count(), 2);
        assert_eq!(output.opacities(), &[0.9, 0.5]);
        assert_eq!(output.id(), source_id);

        let output = output.prune(usize::MAX);
        assert_eq!(output.id(), source_id);
    }

    #[test]
    fn prune_ties_by_index() {
        use super::*;

        let source = scene(vec![0.5; 5]);
        let output = source.prune(3);
        assert_eq!(output.colors_rgb(), &[[0.0; 3], [0.1; 3], [0.2; 3]]);

        let output = scene(vec![0.5; 5]).prune(0);
        assert!(output.is_empty());
        assert_eq!(output.colors_sh_rest().map(<[f32]>::len), Some(0));
    }

    #[test]
    fn prune_random_scene() {
        use super::*;

        let source = SplatScene::random(1000, 7);
        let scores = source.score_points();
        let mut indices = (0..1000).collect::<Vec<_>>();
        indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        assert!(scores[indices[0]] >= scores[indices[99]]);
        let target = indices[..100]
            .iter()
            .map(|&i| source.positions()[i])
            .collect::<Vec<_>>();

        let output = source.prune(100);
        assert_eq!(output.point_count(), 100);
        assert_eq!(output.positions(), target.as_slice());
    }

    #[test]
    fn score_scale_by_mean() {
        use super::*;

        assert_eq!(score_scale(&[0.0005; 3]), 0.1);
        assert_eq!(score_scale(&[0.005; 3]), 0.5);
        assert_eq!(score_scale(&[0.5; 3]), 1.0);
        assert_eq!(score_scale(&[5.0; 3]), 0.5);
        assert_eq!(score_scale(&[20.0; 3]), 0.2);
    }

    #[test]
    fn score_spatial_by_distance() {
        use super::*;

        assert_eq!(score_spatial(0.0), 1.0);
        assert_eq!(score_spatial(25.0), 0.5);
        assert_eq!(score_spatial(100.0), 0.0);
    }

    #[test]
    fn centroid() {
        use super::*;

        let source = SplatScene::new(
            vec![[0.0, 0.0, 0.0], [2.0, 4.0, -6.0]],
            vec![[1.0; 3]; 2],
            vec![1.0; 2],
            vec![[0.1; 3]; 2],
            vec![[0.0, 0.0, 0.0, 1.0]; 2],
            None,
        )
        .unwrap();
        assert_eq!(source.centroid(), [1.0, 2.0, -3.0]);
        assert_eq!(SplatScene::default().centroid(), [0.0; 3]);
    }
}
