use geo::{Bearing, Distance, Haversine};

use crate::cell::Cell;

const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = FULL_TURN / 2.0;

/// Great-circle distance between two cells in meters.
pub fn distance_m(a: &Cell, b: &Cell) -> f64 {
    Haversine::distance(a.point(), b.point())
}

/// Initial bearing from `a` to `b`, degrees clockwise from north in `[0, 360)`.
pub fn bearing_deg(a: &Cell, b: &Cell) -> f64 {
    Haversine::bearing(a.point(), b.point()).rem_euclid(FULL_TURN)
}

/// Smallest angle between two headings, in `[0, 180]`.
pub fn angular_separation(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(FULL_TURN);
    if diff > HALF_TURN {
        FULL_TURN - diff
    } else {
        diff
    }
}

/// 1 when co-located, falling linearly to 0 at `radius_m` and beyond.
pub(crate) fn proximity_factor(distance_m: f64, radius_m: f64) -> f64 {
    (1.0 - distance_m / radius_m).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{angular_separation, bearing_deg, distance_m, proximity_factor};
    use crate::cell::Cell;

    #[test]
    fn distance_is_zero_for_colocated_cells() {
        let a = Cell::new("a", 30, 40.0, -74.0);
        let b = Cell::new("b", 31, 40.0, -74.0);
        assert!(distance_m(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = Cell::new("a", 30, 0.0, 0.0);
        let b = Cell::new("b", 31, 1.0, 0.0);
        let d = distance_m(&a, &b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Cell::new("a", 30, 40.7128, -74.0060);
        let b = Cell::new("b", 31, 40.7306, -73.9352);
        assert!((distance_m(&a, &b) - distance_m(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn bearing_points_north_and_east() {
        let origin = Cell::new("o", 30, 0.0, 0.0);
        let north = Cell::new("n", 31, 1.0, 0.0);
        let east = Cell::new("e", 32, 0.0, 1.0);
        assert!(bearing_deg(&origin, &north).min(360.0 - bearing_deg(&origin, &north)) < 1e-6);
        assert!((bearing_deg(&origin, &east) - 90.0).abs() < 1e-6);
    }

    #[test]
    fn angular_separation_wraps_around_north() {
        assert!((angular_separation(350.0, 10.0) - 20.0).abs() < 1e-12);
        assert!((angular_separation(0.0, 180.0) - 180.0).abs() < 1e-12);
        assert!((angular_separation(120.0, 240.0) - 120.0).abs() < 1e-12);
    }

    #[test]
    fn proximity_factor_clamps_at_radius() {
        assert_eq!(proximity_factor(0.0, 50_000.0), 1.0);
        assert!((proximity_factor(25_000.0, 50_000.0) - 0.5).abs() < 1e-12);
        assert_eq!(proximity_factor(60_000.0, 50_000.0), 0.0);
    }
}
