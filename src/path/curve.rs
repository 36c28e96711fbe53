use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Below this knot spacing a non-uniform segment falls back to unit spacing.
const MIN_KNOT_INTERVAL: f32 = 1e-4;
/// Waypoints closer than this are treated as the same point.
const DUPLICATE_EPSILON: f32 = 1e-6;
const TANGENT_DELTA: f32 = 1e-4;

/// Knot parameterization of the Catmull-Rom spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Uniform knots, tangents scaled by `tension`.
    #[default]
    Uniform,
    /// Knot spacing `|p_i+1 - p_i|^0.5`. Never forms cusps or loops within a segment.
    Centripetal,
    /// Knot spacing `|p_i+1 - p_i|`.
    Chordal,
}

impl CurveKind {
    /// Exponent applied to the squared distance between control points.
    fn knot_exponent(self) -> Option<f32> {
        match self {
            CurveKind::Uniform => None,
            CurveKind::Centripetal => Some(0.25),
            CurveKind::Chordal => Some(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CurveBuilder {
    kind: CurveKind,
    tension: f32,
}

impl Default for CurveBuilder {
    /// Uniform Catmull-Rom at tension 0.5. A tension of 0 gives straight
    /// segments with flat tangents at the waypoints.
    fn default() -> Self {
        Self {
            kind: CurveKind::Uniform,
            tension: 0.5,
        }
    }
}

impl CurveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: CurveKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn tension(mut self, tension: f32) -> Self {
        self.tension = tension;
        self
    }

    pub fn build(&self, points: &[Vec3], closed: bool) -> Result<Curve, PathError> {
        if points.len() < 2 {
            return Err(PathError::TooFewWaypoints {
                count: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(PathError::NonFiniteWaypoint { index });
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[0].abs_diff_eq(pair[1], DUPLICATE_EPSILON) {
                return Err(PathError::DuplicateWaypoint { index: index + 1 });
            }
        }
        let first = points[0];
        let last = points[points.len() - 1];
        if closed && first.abs_diff_eq(last, DUPLICATE_EPSILON) {
            // a closed curve with two distinct points is still a valid loop
            return Err(PathError::DuplicateWaypoint { index: 0 });
        }

        Ok(Curve {
            points: points.to_vec(),
            closed,
            kind: self.kind,
            tension: self.tension,
        })
    }
}

/// Interpolating Catmull-Rom spline through an ordered list of waypoints.
///
/// The parameter domain is `[0, 1]`. Closed curves repeat with period 1,
/// open curves clamp to their end points.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    points: Vec<Vec3>,
    closed: bool,
    kind: CurveKind,
    tension: f32,
}

impl Curve {
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn segment_count(&self) -> usize {
        if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    pub fn evaluate(&self, t: f32) -> Vec3 {
        let t = if self.closed {
            t.rem_euclid(1.0)
        } else {
            t.clamp(0.0, 1.0)
        };
        let l = self.points.len();
        let p = self.segment_count() as f32 * t;
        let mut segment = p.floor() as usize;
        let mut weight = p - segment as f32;
        if !self.closed && segment >= l - 1 {
            segment = l - 2;
            weight = 1.0;
        }

        let [p0, p1, p2, p3] = self.control_points(segment);
        let (m1, m2) = match self.kind.knot_exponent() {
            None => (self.tension * (p2 - p0), self.tension * (p3 - p1)),
            Some(exponent) => nonuniform_tangents(p0, p1, p2, p3, exponent),
        };
        hermite(p1, p2, m1, m2, weight)
    }

    /// Unit direction of travel at `t`, or zero where the curve is stationary.
    pub fn tangent(&self, t: f32) -> Vec3 {
        let (a, b) = if self.closed {
            (t - TANGENT_DELTA, t + TANGENT_DELTA)
        } else {
            (
                (t - TANGENT_DELTA).max(0.0),
                (t + TANGENT_DELTA).min(1.0),
            )
        };
        (self.evaluate(b) - self.evaluate(a)).normalize_or_zero()
    }

    /// The four control points of `segment`; open ends get reflected phantoms.
    fn control_points(&self, segment: usize) -> [Vec3; 4] {
        let points = &self.points;
        let l = points.len();
        if self.closed {
            return [
                points[(segment + l - 1) % l],
                points[segment % l],
                points[(segment + 1) % l],
                points[(segment + 2) % l],
            ];
        }
        let p0 = if segment > 0 {
            points[segment - 1]
        } else {
            2.0 * points[0] - points[1]
        };
        let p3 = if segment + 2 < l {
            points[segment + 2]
        } else {
            2.0 * points[l - 1] - points[l - 2]
        };
        [p0, points[segment], points[segment + 1], p3]
    }
}

fn nonuniform_tangents(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, exponent: f32) -> (Vec3, Vec3) {
    let mut dt1 = p1.distance_squared(p2).powf(exponent);
    let mut dt0 = p0.distance_squared(p1).powf(exponent);
    let mut dt2 = p2.distance_squared(p3).powf(exponent);
    if dt1 < MIN_KNOT_INTERVAL {
        dt1 = 1.0;
    }
    if dt0 < MIN_KNOT_INTERVAL {
        dt0 = dt1;
    }
    if dt2 < MIN_KNOT_INTERVAL {
        dt2 = dt1;
    }

    let m1 = (p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1;
    let m2 = (p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2;
    // rescale from [0, dt1] to the unit segment
    (m1 * dt1, m2 * dt1)
}

/// Cubic Hermite from `a` to `b` with end tangents `ma`, `mb`.
fn hermite(a: Vec3, b: Vec3, ma: Vec3, mb: Vec3, w: f32) -> Vec3 {
    let c2 = -3.0 * a + 3.0 * b - 2.0 * ma - mb;
    let c3 = 2.0 * a - 2.0 * b + ma + mb;
    a + w * (ma + w * (c2 + w * c3))
}
