// Ray-fan collision probe.
//
// Eight rays, one per compass octant, are cast from the vessel across the
// ground plane. An octant is blocked when its nearest hit is within the
// probe distance. The resulting mask vetoes motion: it can zero a component
// of the desired direction but never flips or adds one.

use glam::Vec3;

use super::obstacle::Obstacle;

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Relative slack on the threshold comparison. The diagonal rays are not
/// exactly unit length in f32, so a surface at exactly `threshold` can come
/// back a few ulps further away.
const THRESHOLD_TOLERANCE: f32 = 1e-5;

/// Unit probe directions, indexed by octant: N, NE, E, SE, S, SW, W, NW,
/// where N is +Z and E is +X.
pub const RAY_FAN: [Vec3; 8] = [
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(DIAG, 0.0, DIAG),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(DIAG, 0.0, -DIAG),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(-DIAG, 0.0, -DIAG),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(-DIAG, 0.0, DIAG),
];

pub const OCTANT_NAMES: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

// Octants that cover travel along each signed axis.
const POS_Z: [usize; 3] = [0, 1, 7];
const NEG_Z: [usize; 3] = [3, 4, 5];
const POS_X: [usize; 3] = [1, 2, 3];
const NEG_X: [usize; 3] = [5, 6, 7];

/// Per-octant "something is within reach" flags for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockedMask([bool; 8]);

impl BlockedMask {
    pub const CLEAR: Self = Self([false; 8]);

    pub fn from_octants(octants: [bool; 8]) -> Self {
        Self(octants)
    }

    pub fn is_blocked(&self, octant: usize) -> bool {
        self.0.get(octant).copied().unwrap_or(false)
    }

    pub fn is_clear(&self) -> bool {
        !self.0.iter().any(|&b| b)
    }

    pub fn blocked_count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// `(octant, blocked)` pairs in fan order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.0.iter().copied().enumerate()
    }

    fn any(&self, octants: &[usize]) -> bool {
        octants.iter().any(|&i| self.0[i])
    }

    /// Apply the veto to a desired direction.
    ///
    /// Each axis is checked independently: a positive Z component is zeroed
    /// when any northern octant is blocked, a negative one when any southern
    /// octant is, and likewise for X with the eastern and western octants.
    pub fn gate(&self, direction: Vec3) -> Vec3 {
        let mut gated = direction;
        if (gated.z > 0.0 && self.any(&POS_Z)) || (gated.z < 0.0 && self.any(&NEG_Z)) {
            gated.z = 0.0;
        }
        if (gated.x > 0.0 && self.any(&POS_X)) || (gated.x < 0.0 && self.any(&NEG_X)) {
            gated.x = 0.0;
        }
        gated
    }

    /// Compact label such as `"N NE E"`, for logs and the overlay.
    pub fn describe(&self) -> String {
        self.iter()
            .filter(|&(_, blocked)| blocked)
            .map(|(i, _)| OCTANT_NAMES[i])
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cast every ray of `fan` from `position` and flag the octants whose nearest
/// obstacle is at most `threshold` away (up to `THRESHOLD_TOLERANCE`).
pub fn probe(position: Vec3, fan: &[Vec3; 8], obstacles: &[Obstacle], threshold: f32) -> BlockedMask {
    if obstacles.is_empty() {
        return BlockedMask::CLEAR;
    }

    let reach = threshold * (1.0 + THRESHOLD_TOLERANCE);
    let mut blocked = [false; 8];
    for (octant, ray) in fan.iter().enumerate() {
        let nearest = obstacles
            .iter()
            .filter_map(|o| o.ray_distance(position, *ray))
            .fold(f32::INFINITY, f32::min);
        blocked[octant] = nearest <= reach;
    }
    BlockedMask::from_octants(blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wall_across(axis_point: Vec3, normal: Vec3) -> Obstacle {
        Obstacle::Wall {
            center: axis_point + Vec3::Y * 64.0,
            normal,
            half_width: 500.0,
            half_height: 64.0,
        }
    }

    #[test]
    fn test_fan_is_unit_length() {
        for ray in RAY_FAN {
            assert!((ray.length() - 1.0).abs() < 1e-6);
            assert_eq!(ray.y, 0.0);
        }
    }

    #[test]
    fn test_empty_obstacles_never_block() {
        let mask = probe(Vec3::ZERO, &RAY_FAN, &[], 24.0);
        assert!(mask.is_clear());
        assert_eq!(mask.gate(Vec3::new(1.0, 0.0, -1.0)), Vec3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn test_threshold_boundary_per_axis_octant() {
        // (octant, wall position, inward normal)
        let cases = [
            (0, Vec3::new(0.0, 0.0, 24.0), Vec3::NEG_Z),
            (2, Vec3::new(24.0, 0.0, 0.0), Vec3::NEG_X),
            (4, Vec3::new(0.0, 0.0, -24.0), Vec3::Z),
            (6, Vec3::new(-24.0, 0.0, 0.0), Vec3::X),
        ];
        for (octant, at, normal) in cases {
            let wall = [wall_across(at, normal)];
            assert!(probe(Vec3::ZERO, &RAY_FAN, &wall, 24.0).is_blocked(octant));
            assert!(!probe(Vec3::ZERO, &RAY_FAN, &wall, 23.5).is_blocked(octant));
        }
    }

    #[test]
    fn test_wall_blocks_diagonals_within_reach() {
        // A wall at x = 10: the E ray hits at 10, NE/SE at 10·√2 ≈ 14.1.
        let wall = [wall_across(Vec3::new(10.0, 0.0, 0.0), Vec3::NEG_X)];
        let mask = probe(Vec3::ZERO, &RAY_FAN, &wall, 24.0);
        assert_eq!(mask.describe(), "NE E SE");
        assert_eq!(mask.blocked_count(), 3);

        // At x = 20 the diagonals are 28.3 away: only E remains.
        let wall = [wall_across(Vec3::new(20.0, 0.0, 0.0), Vec3::NEG_X)];
        assert_eq!(probe(Vec3::ZERO, &RAY_FAN, &wall, 24.0).describe(), "E");
    }

    #[test]
    fn test_far_wall_is_ignored() {
        let wall = [wall_across(Vec3::new(30.0, 0.0, 0.0), Vec3::NEG_X)];
        assert!(probe(Vec3::ZERO, &RAY_FAN, &wall, 24.0).is_clear());
    }

    #[test]
    fn test_gate_only_vetoes_matching_sign() {
        let east = BlockedMask::from_octants([false, false, true, false, false, false, false, false]);
        assert_eq!(east.gate(Vec3::new(1.0, 0.0, 1.0)), Vec3::new(0.0, 0.0, 1.0));
        // Moving away from the blocked side is allowed.
        assert_eq!(east.gate(Vec3::new(-1.0, 0.0, 1.0)), Vec3::new(-1.0, 0.0, 1.0));
    }

    #[test]
    fn test_gate_axes_are_independent() {
        // NE blocked: both +X and +Z travel are vetoed.
        let ne = BlockedMask::from_octants([false, true, false, false, false, false, false, false]);
        assert_eq!(ne.gate(Vec3::new(1.0, 0.0, 1.0)), Vec3::ZERO);
        assert_eq!(ne.gate(Vec3::new(-1.0, 0.0, 1.0)), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(ne.gate(Vec3::new(1.0, 0.0, -1.0)), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_gate_does_not_steer() {
        let all = BlockedMask::from_octants([true; 8]);
        assert_eq!(all.gate(Vec3::new(0.3, 0.0, -0.7)), Vec3::ZERO);
        assert_eq!(all.gate(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_diagonal_wall_at_threshold_blocks() {
        for octant in [1, 3, 5, 7] {
            let ray = RAY_FAN[octant];
            let wall = [wall_across(ray * 100.0, -ray)];
            let mask = probe(Vec3::ZERO, &RAY_FAN, &wall, 100.0);
            assert!(mask.is_blocked(octant), "octant {octant}");
        }
    }

    proptest! {
        #[test]
        fn prop_wall_at_threshold_blocks_its_octant(
            octant in 0usize..8,
            distance in 0.5f32..500.0,
        ) {
            let ray = RAY_FAN[octant];
            let wall = [wall_across(ray * distance, -ray)];
            prop_assert!(probe(Vec3::ZERO, &RAY_FAN, &wall, distance).is_blocked(octant));
            prop_assert!(!probe(Vec3::ZERO, &RAY_FAN, &wall, distance * 0.999).is_blocked(octant));
        }

        #[test]
        fn prop_gate_is_idempotent(
            octants in proptest::array::uniform8(any::<bool>()),
            x in -1.0f32..1.0,
            z in -1.0f32..1.0,
        ) {
            let mask = BlockedMask::from_octants(octants);
            let once = mask.gate(Vec3::new(x, 0.0, z));
            prop_assert_eq!(mask.gate(once), once);
        }

        #[test]
        fn prop_gate_never_grows_a_component(
            octants in proptest::array::uniform8(any::<bool>()),
            x in -1.0f32..1.0,
            z in -1.0f32..1.0,
        ) {
            let gated = BlockedMask::from_octants(octants).gate(Vec3::new(x, 0.0, z));
            prop_assert!(gated.x == x || gated.x == 0.0);
            prop_assert!(gated.z == z || gated.z == 0.0);
        }
    }
}
