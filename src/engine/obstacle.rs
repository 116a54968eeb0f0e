// Static collidable geometry and the registry the collision probe queries.
//
// Obstacles are built once while the arena is constructed and never change
// afterwards. Each shape answers a single question: how far along a ray is
// the nearest surface?

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::mesh::PolyMesh;

const EPSILON: f32 = 1e-6;

/// One piece of static world geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Obstacle {
    /// Finite vertical rectangle. `normal` is horizontal; the rectangle spans
    /// `half_width` either side of `center` across the normal and
    /// `half_height` above and below it. Hit from either side.
    Wall {
        center: Vec3,
        normal: Vec3,
        half_width: f32,
        half_height: f32,
    },
    /// Axis-aligned box.
    Block { min: Vec3, max: Vec3 },
    /// Triangle soup for arbitrary scenery. Hit from either side.
    Hull { triangles: Vec<[Vec3; 3]> },
}

impl Obstacle {
    /// Fan-triangulate `mesh`, scale it, then move it to `offset`.
    pub fn hull_from_mesh(mesh: &PolyMesh, offset: Vec3, scale: Vec3) -> Self {
        let triangles = mesh
            .triangles()
            .map(|tri| tri.map(|p| p * scale + offset))
            .collect();
        Obstacle::Hull { triangles }
    }

    /// Distance from `origin` to the nearest intersection along the unit
    /// direction `dir`, or `None` if the ray misses.
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match self {
            Obstacle::Wall { center, normal, half_width, half_height } => {
                wall_hit(origin, dir, *center, *normal, *half_width, *half_height)
            }
            Obstacle::Block { min, max } => block_hit(origin, dir, *min, *max),
            Obstacle::Hull { triangles } => triangles
                .iter()
                .filter_map(|tri| triangle_hit(origin, dir, tri))
                .min_by(f32::total_cmp),
        }
    }

    /// Axis-aligned bounds `(min, max)`, used to draw the obstacle.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        match self {
            Obstacle::Wall { center, normal, half_width, half_height } => {
                let across = Vec3::Y.cross(*normal).normalize_or_zero();
                let extent = (across * *half_width).abs() + Vec3::Y * *half_height;
                (*center - extent, *center + extent)
            }
            Obstacle::Block { min, max } => (*min, *max),
            Obstacle::Hull { triangles } => triangles.iter().flatten().fold(
                (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(lo, hi), p| (lo.min(*p), hi.max(*p)),
            ),
        }
    }
}

fn wall_hit(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    normal: Vec3,
    half_width: f32,
    half_height: f32,
) -> Option<f32> {
    let denom = dir.dot(normal);
    if denom.abs() <= EPSILON {
        // Parallel to the wall plane.
        return None;
    }
    let t = (center - origin).dot(normal) / denom;
    if t < 0.0 {
        return None;
    }
    let local = origin + dir * t - center;
    let across = Vec3::Y.cross(normal).normalize_or_zero();
    if local.dot(across).abs() > half_width || local.y.abs() > half_height {
        return None;
    }
    Some(t)
}

/// Slab test. A ray starting inside the box reports the exit distance.
fn block_hit(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() <= EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let a = (min[axis] - o) * inv;
        let b = (max[axis] - o) * inv;
        t_near = t_near.max(a.min(b));
        t_far = t_far.min(a.max(b));
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

/// Möller–Trumbore, without back-face culling.
fn triangle_hit(origin: Vec3, dir: Vec3, [a, b, c]: &[Vec3; 3]) -> Option<f32> {
    let e1 = *b - *a;
    let e2 = *c - *a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() <= EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - *a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

// ============================================================================
// REGISTRY
// ============================================================================

/// All static obstacles of the arena.
///
/// Inserted into the ECS world as a resource; steering systems read it via
/// `Res<ObstacleRegistry>`. Empty until world construction has finished, and
/// every consumer treats "empty" as "nothing in the way".
#[derive(Resource, Debug, Clone, Default)]
pub struct ObstacleRegistry {
    obstacles: Vec<Obstacle>,
}

impl ObstacleRegistry {
    /// Registry for a world whose geometry is not built yet.
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn from_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::unit_cube;

    fn east_wall(x: f32) -> Obstacle {
        Obstacle::Wall {
            center: Vec3::new(x, 64.0, 0.0),
            normal: Vec3::NEG_X,
            half_width: 100.0,
            half_height: 64.0,
        }
    }

    #[test]
    fn test_wall_hit_distance() {
        let wall = east_wall(24.0);
        assert_eq!(wall.ray_distance(Vec3::ZERO, Vec3::X), Some(24.0));
        // Behind the origin.
        assert_eq!(wall.ray_distance(Vec3::ZERO, Vec3::NEG_X), None);
        // Parallel.
        assert_eq!(wall.ray_distance(Vec3::ZERO, Vec3::Z), None);
    }

    #[test]
    fn test_wall_is_finite() {
        let wall = east_wall(24.0);
        // Passes beside the wall's edge.
        assert_eq!(wall.ray_distance(Vec3::new(0.0, 0.0, 150.0), Vec3::X), None);
        // Passes above it.
        assert_eq!(wall.ray_distance(Vec3::new(0.0, 200.0, 0.0), Vec3::X), None);
    }

    #[test]
    fn test_wall_hit_from_behind() {
        let wall = east_wall(24.0);
        assert_eq!(wall.ray_distance(Vec3::new(40.0, 0.0, 0.0), Vec3::NEG_X), Some(16.0));
    }

    #[test]
    fn test_block_hit_and_inside() {
        let block = Obstacle::Block {
            min: Vec3::new(10.0, -5.0, -5.0),
            max: Vec3::new(20.0, 5.0, 5.0),
        };
        assert_eq!(block.ray_distance(Vec3::ZERO, Vec3::X), Some(10.0));
        assert_eq!(block.ray_distance(Vec3::ZERO, Vec3::NEG_X), None);
        assert_eq!(block.ray_distance(Vec3::ZERO, Vec3::Z), None);
        // From inside: exit distance.
        assert_eq!(block.ray_distance(Vec3::new(15.0, 0.0, 0.0), Vec3::X), Some(5.0));
    }

    #[test]
    fn test_hull_reports_nearest_face() {
        let hull = Obstacle::hull_from_mesh(&unit_cube(), Vec3::new(30.0, 0.0, 0.0), Vec3::splat(10.0));
        let origin = Vec3::new(0.0, 1.0, -2.0);
        let d = hull.ray_distance(origin, Vec3::X).expect("hull in the way");
        assert!((d - 25.0).abs() < 1e-4, "got {d}");
        assert_eq!(hull.ray_distance(origin, Vec3::Z), None);
    }

    #[test]
    fn test_hull_diagonal_ray() {
        let hull = Obstacle::hull_from_mesh(&unit_cube(), Vec3::new(20.0, 0.0, 20.0), Vec3::splat(10.0));
        let diag = Vec3::new(1.0, 0.0, 1.0).normalize();
        let d = hull
            .ray_distance(Vec3::new(0.0, 1.0, 3.0), diag)
            .expect("hull on the diagonal");
        // Enters through the -X face at (15, 1, 18).
        assert!((d - 15.0 * std::f32::consts::SQRT_2).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_bounds() {
        let (lo, hi) = east_wall(24.0).bounds();
        assert!((lo - Vec3::new(24.0, 0.0, -100.0)).length() < 1e-4);
        assert!((hi - Vec3::new(24.0, 128.0, 100.0)).length() < 1e-4);

        let hull = Obstacle::hull_from_mesh(&unit_cube(), Vec3::new(5.0, 0.0, 0.0), Vec3::splat(2.0));
        assert_eq!(hull.bounds(), (Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0)));
    }

    #[test]
    fn test_loading_registry_is_empty() {
        let registry = ObstacleRegistry::loading();
        assert!(registry.is_empty());
        assert!(registry.obstacles().is_empty());
        let registry = ObstacleRegistry::from_obstacles(vec![east_wall(10.0)]);
        assert_eq!(registry.len(), 1);
    }
}
