//! 2D vector math for quad placement and rasterization

use std::ops::Add;

/// 2D Vector (screen positions and texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotate about the origin given a precomputed (sin, cos)
    pub fn rotate(self, sin: f32, cos: f32) -> Vec2 {
        Vec2 {
            x: cos * self.x - sin * self.y,
            y: sin * self.x + cos * self.y,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

/// (sin, cos) of an angle in degrees
///
/// Multiples of 90 degrees come back exact so axis-aligned draws stay on
/// integer coordinates.
pub fn sin_cos_degrees(degrees: f32) -> (f32, f32) {
    let turns = degrees.rem_euclid(360.0);
    if turns == 0.0 {
        (0.0, 1.0)
    } else if turns == 90.0 {
        (1.0, 0.0)
    } else if turns == 180.0 {
        (0.0, -1.0)
    } else if turns == 270.0 {
        (-1.0, 0.0)
    } else {
        turns.to_radians().sin_cos()
    }
}

/// Calculate barycentric coordinates for point p in triangle (v1, v2, v3)
/// Returns (u, v, w) where u + v + w = 1 if point is inside triangle
pub fn barycentric(p: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> (f32, f32, f32) {
    let d = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);

    if d.abs() < 0.0001 {
        return (-1.0, -1.0, -1.0); // Degenerate triangle
    }

    let u = ((v2.y - v3.y) * (p.x - v3.x) + (v3.x - v2.x) * (p.y - v3.y)) / d;
    let v = ((v3.y - v1.y) * (p.x - v3.x) + (v1.x - v3.x) * (p.y - v3.y)) / d;
    let w = 1.0 - u - v;

    (u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_quarter_turn() {
        let (s, c) = sin_cos_degrees(90.0);
        let r = Vec2::new(2.0, 0.0).rotate(s, c);
        assert_eq!(r, Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_sin_cos_exact_axes() {
        assert_eq!(sin_cos_degrees(0.0), (0.0, 1.0));
        assert_eq!(sin_cos_degrees(-90.0), (-1.0, 0.0));
        assert_eq!(sin_cos_degrees(540.0), (0.0, -1.0));
        let (s, c) = sin_cos_degrees(30.0);
        assert!((s - 0.5).abs() < 0.0001);
        assert!((c - 0.8660254).abs() < 0.0001);
    }

    #[test]
    fn test_barycentric_inside() {
        let v1 = Vec2::new(0.0, 0.0);
        let v2 = Vec2::new(10.0, 0.0);
        let v3 = Vec2::new(5.0, 10.0);
        let (a, b, c) = barycentric(Vec2::new(5.0, 3.0), v1, v2, v3);
        assert!(a >= 0.0 && b >= 0.0 && c >= 0.0);
        let (a, b, c) = barycentric(Vec2::new(-5.0, 3.0), v1, v2, v3);
        assert!(a < 0.0 || b < 0.0 || c < 0.0);
    }

    #[test]
    fn test_rotate_then_translate() {
        let (s, c) = sin_cos_degrees(180.0);
        let p = Vec2::new(3.0, 4.0).rotate(s, c) + Vec2::new(10.0, 10.0);
        assert_eq!(p, Vec2::new(7.0, 6.0));
    }
}
