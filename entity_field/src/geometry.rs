//! Field-space geometry. Origin top-left, y grows downward, units are pixels.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 { Vec2::new(self.x + o.x, self.y + o.y) }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 { Vec2::new(self.x - o.x, self.y - o.y) }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f32) -> Vec2 { Vec2::new(self.x * k, self.y * k) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Size { w, h }
    }

    pub fn scaled(self, k: f32) -> Size {
        Size::new(self.w * k, self.h * k)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn at(position: Vec2, size: Size) -> Self {
        Rect::new(position.x, position.y, size.w, size.h)
    }

    /// Rectangle of `size` centred on `center`.
    pub fn centered(center: Vec2, size: Size) -> Self {
        Rect::new(center.x - size.w / 2.0, center.y - size.h / 2.0, size.w, size.h)
    }

    pub fn left(&self)   -> f32 { self.x }
    pub fn right(&self)  -> f32 { self.x + self.w }
    pub fn top(&self)    -> f32 { self.y }
    pub fn bottom(&self) -> f32 { self.y + self.h }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap; touching edges do not intersect.
    pub fn intersects(&self, o: &Rect) -> bool {
        self.left() < o.right() && o.left() < self.right()
            && self.top() < o.bottom() && o.top() < self.bottom()
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Same centre, dimensions scaled by `k`.
    pub fn scaled(&self, k: f32) -> Rect {
        Rect::centered(self.center(), Size::new(self.w * k, self.h * k))
    }

    /// Map a normalized `[0, 1]` point into this rectangle.
    pub fn denormalize(&self, nx: f32, ny: f32) -> Vec2 {
        Vec2::new(self.x + nx * self.w, self.y + ny * self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rect::new(0.0, 20.0, 5.0, 5.0)));
    }

    #[test]
    fn centered_and_scaled_share_center() {
        let r = Rect::centered(Vec2::new(50.0, 40.0), Size::new(20.0, 10.0));
        assert_eq!(r, Rect::new(40.0, 35.0, 20.0, 10.0));
        let half = r.scaled(0.5);
        assert_eq!(half.center(), r.center());
        assert_eq!(half.w, 10.0);
    }

    #[test]
    fn denormalize_maps_unit_square() {
        let field = Rect::new(0.0, 0.0, 1280.0, 720.0);
        assert_eq!(field.denormalize(0.5, 0.25), Vec2::new(640.0, 180.0));
        assert!(field.contains(field.denormalize(1.0, 1.0)));
    }
}
