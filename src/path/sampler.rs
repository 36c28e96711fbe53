use glam::Vec3;

use crate::error::PathError;

use super::curve::Curve;

/// Arc-length table over a curve: `lengths[i]` is the distance travelled up to
/// parameter `i / divisions`.
struct ArcLengths {
    lengths: Vec<f32>,
}

impl ArcLengths {
    fn measure(curve: &Curve, divisions: usize) -> Self {
        let divisions = divisions.max(1);
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut last = curve.evaluate(0.0);
        let mut sum = 0.0f32;
        lengths.push(0.0);
        for i in 1..=divisions {
            let current = curve.evaluate(i as f32 / divisions as f32);
            sum += current.distance(last);
            lengths.push(sum);
            last = current;
        }
        Self { lengths }
    }

    fn total(&self) -> f32 {
        self.lengths[self.lengths.len() - 1]
    }

    /// Maps a normalized distance `u` to the curve parameter that reaches it.
    fn u_to_t(&self, u: f32) -> f32 {
        let divisions = self.lengths.len() - 1;
        let target = u.clamp(0.0, 1.0) * self.total();

        // first index whose length is >= target
        let i = self.lengths.partition_point(|&l| l < target);
        if i == 0 {
            return 0.0;
        }
        if i > divisions {
            return 1.0;
        }
        let before = self.lengths[i - 1];
        let segment = self.lengths[i] - before;
        let fraction = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };
        ((i - 1) as f32 + fraction) / divisions as f32
    }
}

/// Precomputes arc-length spaced points along a curve.
pub struct SpacedSampler {
    arc_length_divisions: usize,
}

impl Default for SpacedSampler {
    fn default() -> Self {
        Self {
            arc_length_divisions: 2_000,
        }
    }
}

impl SpacedSampler {
    pub fn new(arc_length_divisions: usize) -> Self {
        Self {
            arc_length_divisions: arc_length_divisions.max(1),
        }
    }

    /// Samples `count` points. Closed curves are sampled at `i / count` so
    /// index arithmetic wraps cleanly; open curves at `i / (count - 1)` so the
    /// last sample is the terminal point.
    ///
    /// O(count) and meant to run once per path, never per frame.
    pub fn sample(&self, curve: &Curve, count: usize) -> Result<SampledPath, PathError> {
        if count == 0 {
            return Err(PathError::EmptySampling);
        }
        let arc = ArcLengths::measure(curve, self.arc_length_divisions);
        let total_length = arc.total();
        if !(total_length > f32::EPSILON) {
            return Err(PathError::ZeroLength);
        }

        let closed = curve.is_closed();
        let denominator = if closed || count == 1 {
            count
        } else {
            count - 1
        } as f32;
        let mut points = Vec::with_capacity(count);
        points.push(curve.evaluate(0.0));
        for i in 1..count {
            let t = arc.u_to_t(i as f32 / denominator);
            points.push(curve.evaluate(t));
        }

        Ok(SampledPath {
            points,
            closed,
            total_length,
        })
    }
}

/// Fixed sequence of approximately equidistant points along a curve.
#[derive(Debug, Clone)]
pub struct SampledPath {
    points: Vec<Vec3>,
    closed: bool,
    total_length: f32,
}

impl SampledPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Wraps for closed paths, clamps to the last sample for open ones.
    pub fn wrap_index(&self, index: usize) -> usize {
        if self.closed {
            index % self.points.len()
        } else {
            index.min(self.points.len() - 1)
        }
    }

    pub fn point(&self, index: usize) -> Vec3 {
        self.points[self.wrap_index(index)]
    }

    /// Coarse polyline of `divisions` segments for drawing the track.
    /// Closed paths repeat the first point at the end.
    pub fn preview(&self, divisions: usize) -> Vec<Vec3> {
        let divisions = divisions.clamp(1, self.points.len());
        let last = if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        };
        (0..=divisions)
            .map(|i| self.point(i * last / divisions))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::curve::CurveBuilder;
    use approx::assert_relative_eq;

    fn square_loop() -> Curve {
        CurveBuilder::new()
            .build(
                &[
                    Vec3::new(-60.0, 0.0, 60.0),
                    Vec3::new(-60.0, 0.0, -60.0),
                    Vec3::new(60.0, 0.0, -60.0),
                    Vec3::new(60.0, 0.0, 60.0),
                ],
                true,
            )
            .unwrap()
    }

    #[test]
    fn first_sample_is_curve_start() {
        let curve = square_loop();
        let path = SpacedSampler::default().sample(&curve, 1000).unwrap();
        assert_eq!(path.len(), 1000);
        assert_eq!(path.points()[0], curve.evaluate(0.0));
    }

    #[test]
    fn samples_are_roughly_equidistant() {
        let path = SpacedSampler::default().sample(&square_loop(), 500).unwrap();
        let expected = path.total_length() / 500.0;
        for i in 0..path.len() {
            let step = path.point(i).distance(path.point(i + 1));
            assert_relative_eq!(step, expected, max_relative = 0.05);
        }
    }

    #[test]
    fn open_paths_end_on_the_terminal_point() {
        let a = Vec3::ZERO;
        let b = Vec3::new(0.0, 0.0, -10.0);
        let c = Vec3::new(10.0, 0.0, -10.0);
        let curve = CurveBuilder::new().build(&[a, b, c], false).unwrap();
        let path = SpacedSampler::default().sample(&curve, 100).unwrap();
        assert!(path.points()[99].abs_diff_eq(c, 1e-3));
        assert_eq!(path.wrap_index(150), 99);
    }

    #[test]
    fn closed_indices_wrap() {
        let path = SpacedSampler::default().sample(&square_loop(), 100).unwrap();
        assert_eq!(path.wrap_index(100), 0);
        assert_eq!(path.wrap_index(149), 49);
        assert_eq!(path.point(100), path.point(0));
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = SpacedSampler::default().sample(&square_loop(), 0).unwrap_err();
        assert_eq!(err, PathError::EmptySampling);
    }

    #[test]
    fn preview_closes_the_loop() {
        let path = SpacedSampler::default().sample(&square_loop(), 1000).unwrap();
        let preview = path.preview(100);
        assert_eq!(preview.len(), 101);
        assert_eq!(preview[0], preview[100]);
    }
}
