//! Pure 2D geometry used by collision resolution and hit-scan.
//!
//! Polygons are closed: the last point connects back to the first. All
//! routines are free of game state.

use glam::Vec2;

const EPSILON: f32 = 1e-6;

/// Contact between a circle and a polygon boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleContact {
    /// Signed distance from the circle centre to the boundary; negative when
    /// the centre lies inside the polygon.
    pub distance: f32,
    /// Unit normal pointing from the polygon towards the circle centre.
    pub normal: Vec2,
    /// Angle of `normal`, in radians.
    pub angle: f32,
    pub closest: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        Self::new(vec![
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ])
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let count = self.points.len();
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % count]))
    }

    pub fn centroid(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    pub fn bounding_radius(&self) -> f32 {
        let center = self.centroid();
        self.points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f32::max)
    }

    /// Even-odd point containment.
    pub fn contains(&self, point: Vec2) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn closest_point(&self, point: Vec2) -> Option<Vec2> {
        self.edges()
            .map(|(a, b)| closest_point_on_segment(a, b, point))
            .min_by(|x, y| x.distance_squared(point).total_cmp(&y.distance_squared(point)))
    }

    /// Distance from `point` to the boundary, negative inside. An empty
    /// polygon is infinitely far away.
    pub fn signed_distance(&self, point: Vec2) -> f32 {
        match self.closest_point(point) {
            Some(closest) => {
                let distance = closest.distance(point);
                if self.contains(point) { -distance } else { distance }
            }
            None => f32::INFINITY,
        }
    }

    /// Returns the contact if a circle at `center` overlaps the polygon.
    pub fn circle_contact(&self, center: Vec2, radius: f32) -> Option<CircleContact> {
        let closest = self.closest_point(center)?;
        let inside = self.contains(center);
        let offset = center - closest;
        let magnitude = offset.length();
        let distance = if inside { -magnitude } else { magnitude };
        if distance >= radius {
            return None;
        }

        let mut normal = if magnitude > EPSILON {
            offset / magnitude
        } else {
            (center - self.centroid()).normalize_or(Vec2::X)
        };
        if inside {
            normal = -normal;
        }

        Some(CircleContact {
            distance,
            normal,
            angle: normal.y.atan2(normal.x),
            closest,
        })
    }

    /// Nearest crossing of the segment `origin..end` with the boundary.
    pub fn ray_intersection(&self, origin: Vec2, end: Vec2) -> Option<RayHit> {
        let length = origin.distance(end);
        self.edges()
            .filter_map(|(a, b)| segment_intersection(origin, end, a, b))
            .min_by(f32::total_cmp)
            .map(|t| {
                let point = origin.lerp(end, t);
                RayHit {
                    point,
                    distance: t * length,
                }
            })
    }
}

/// Parameter along `p0..p1` where it crosses `q0..q1`, if it does.
pub fn segment_intersection(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<f32> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = r.perp_dot(s);
    if denom.abs() < EPSILON {
        return None;
    }
    let qp = q0 - p0;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then_some(t)
}

pub fn closest_point_on_segment(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq < EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Unclamped projection of `point` onto the line through `origin` with unit
/// `direction`. Returns the parametric distance along the line.
pub fn project_onto_ray(origin: Vec2, direction: Vec2, point: Vec2) -> f32 {
    (point - origin).dot(direction)
}

/// Where a ray leaving `origin` along unit `direction` crosses the boundary
/// of the axis-aligned rectangle `min..max`.
pub fn ray_rect_exit(origin: Vec2, direction: Vec2, min: Vec2, max: Vec2) -> Option<Vec2> {
    let mut t_enter = 0.0_f32;
    let mut t_exit = f32::INFINITY;

    for axis in 0..2 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let mut t1 = (min[axis] - o) / d;
        let mut t2 = (max[axis] - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_enter = t_enter.max(t1);
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    (t_exit.is_finite() && t_exit >= 0.0).then(|| origin + direction * t_exit)
}

/// Mirrors `velocity` about the surface with unit `normal`.
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::rectangle(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0))
    }

    #[test]
    fn test_contains() {
        let square = unit_square();
        assert!(square.contains(Vec2::new(5.0, 5.0)));
        assert!(!square.contains(Vec2::new(15.0, 5.0)));
        assert!(!Polygon::new(vec![Vec2::ZERO, Vec2::X]).contains(Vec2::ZERO));
    }

    #[test]
    fn test_signed_distance() {
        let square = unit_square();
        assert!((square.signed_distance(Vec2::new(13.0, 5.0)) - 3.0).abs() < 1e-4);
        assert!((square.signed_distance(Vec2::new(8.0, 5.0)) + 2.0).abs() < 1e-4);
        assert_eq!(Polygon::default().signed_distance(Vec2::ZERO), f32::INFINITY);
    }

    #[test]
    fn test_circle_contact_outside() {
        let square = unit_square();

        assert!(square.circle_contact(Vec2::new(15.0, 5.0), 4.0).is_none());

        let contact = square.circle_contact(Vec2::new(13.0, 5.0), 4.0).unwrap();
        assert!((contact.distance - 3.0).abs() < 1e-4);
        assert!((contact.normal - Vec2::X).length() < 1e-4);
        assert!(contact.angle.abs() < 1e-4);
    }

    #[test]
    fn test_circle_contact_inside_points_outward() {
        let square = unit_square();
        let contact = square.circle_contact(Vec2::new(9.0, 5.0), 1.0).unwrap();

        assert!(contact.distance < 0.0);
        assert!((contact.normal - Vec2::X).length() < 1e-4);
    }

    #[test]
    fn test_ray_intersection_nearest_edge() {
        let square = unit_square();
        let hit = square
            .ray_intersection(Vec2::new(-5.0, 5.0), Vec2::new(20.0, 5.0))
            .unwrap();

        assert!((hit.point - Vec2::new(0.0, 5.0)).length() < 1e-4);
        assert!((hit.distance - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_ray_misses() {
        let square = unit_square();
        assert!(
            square
                .ray_intersection(Vec2::new(-5.0, 20.0), Vec2::new(20.0, 20.0))
                .is_none()
        );
    }

    #[test]
    fn test_ray_rect_exit() {
        let exit = ray_rect_exit(
            Vec2::new(50.0, 50.0),
            Vec2::X,
            Vec2::ZERO,
            Vec2::new(100.0, 100.0),
        )
        .unwrap();
        assert!((exit - Vec2::new(100.0, 50.0)).length() < 1e-4);

        let diagonal = Vec2::new(1.0, 1.0).normalize();
        let exit = ray_rect_exit(
            Vec2::new(90.0, 50.0),
            diagonal,
            Vec2::ZERO,
            Vec2::new(100.0, 100.0),
        )
        .unwrap();
        assert!((exit.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_ray_rect_exit_from_outside_pointing_away() {
        assert!(
            ray_rect_exit(
                Vec2::new(-10.0, 50.0),
                -Vec2::X,
                Vec2::ZERO,
                Vec2::new(100.0, 100.0)
            )
            .is_none()
        );
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(Vec2::new(3.0, -4.0), Vec2::Y);
        assert!((reflected - Vec2::new(3.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn test_closest_point_on_degenerate_segment() {
        let p = closest_point_on_segment(Vec2::ONE, Vec2::ONE, Vec2::ZERO);
        assert_eq!(p, Vec2::ONE);
    }
}
