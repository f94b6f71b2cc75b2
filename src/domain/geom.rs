/// Plane geometry for the collision world.
///
/// World units are map pixels, y grows downward (the top of the tower has
/// the smallest y). Everything is axis-aligned: a `Shape` is either a
/// rectangle or a bulk-less marker point.

use std::ops::{Add, Sub};

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

/// Axis-aligned rectangle, `(x, y)` is the top-left corner.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> f64 { self.x + self.w }
    pub fn bottom(&self) -> f64 { self.y + self.h }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// No area: never collides with anything.
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Edge-inclusive point test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, o: &Rect) -> bool {
        if self.is_empty() || o.is_empty() { return false; }
        self.x < o.right() && self.right() > o.x && self.y < o.bottom() && self.bottom() > o.y
    }

    pub fn vertices(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.x, self.bottom()),
        ]
    }
}

/// Result of a narrow-phase hit.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Contact {
    /// Smallest translation that moves the tested shape out of the other one.
    /// Exactly one component is non-zero.
    pub mtv: Vec2,
}

/// Collision shape of an object.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Shape {
    Rect(Rect),
    /// A position with no physical bulk (map markers).
    Marker(Vec2),
}

impl Shape {
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::Rect(Rect::new(x, y, w, h))
    }

    /// Bounding box. Markers have a zero-size box at their position.
    pub fn bounds(&self) -> Rect {
        match *self {
            Shape::Rect(r) => r,
            Shape::Marker(p) => Rect::new(p.x, p.y, 0.0, 0.0),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Shape {
        match *self {
            Shape::Rect(r) => Shape::Rect(r.translated(dx, dy)),
            Shape::Marker(p) => Shape::Marker(Vec2::new(p.x + dx, p.y + dy)),
        }
    }

    fn solid(&self) -> Option<Rect> {
        match *self {
            Shape::Rect(r) if !r.is_empty() => Some(r),
            _ => None,
        }
    }

    /// Would `self`, moved by `(dx, dy)`, overlap `other`?
    ///
    /// The MTV is taken along the axis of least penetration and points
    /// away from `other`'s centre. On an exact tie the Y axis is used.
    pub fn intersect(&self, dx: f64, dy: f64, other: &Shape) -> Option<Contact> {
        let a = self.solid()?.translated(dx, dy);
        let b = other.solid()?;
        if !a.overlaps(&b) { return None; }

        let ox = a.right().min(b.right()) - a.x.max(b.x);
        let oy = a.bottom().min(b.bottom()) - a.y.max(b.y);
        let (ca, cb) = (a.center(), b.center());

        let mtv = if ox < oy {
            Vec2::new(if ca.x < cb.x { -ox } else { ox }, 0.0)
        } else {
            Vec2::new(0.0, if ca.y < cb.y { -oy } else { oy })
        };
        Some(Contact { mtv })
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        match self.solid() {
            Some(r) => r.contains_point(p),
            None => false,
        }
    }

    /// Every vertex of `self` lies within `other`. Catches a shape that sits
    /// wholly inside a thin strip without crossing any of its edges.
    pub fn inside_of(&self, other: &Shape) -> bool {
        let (Some(a), Some(_)) = (self.solid(), other.solid()) else {
            return false;
        };
        a.vertices().iter().all(|&v| other.contains_point(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Shape::rect(0.0, 0.0, 8.0, 8.0);
        let wall = Shape::rect(8.0, 0.0, 16.0, 16.0);
        assert!(a.intersect(0.0, 0.0, &wall).is_none());
        assert!(a.intersect(0.5, 0.0, &wall).is_some());
    }

    #[test]
    fn mtv_points_out_of_the_obstacle() {
        let actor = Shape::rect(0.0, 0.0, 8.0, 8.0);
        let floor = Shape::rect(0.0, 10.0, 16.0, 16.0);

        // moving down 4 -> 2 units of penetration from above
        let c = actor.intersect(0.0, 4.0, &floor).unwrap();
        assert!(approx(c.mtv.x, 0.0));
        assert!(approx(c.mtv.y, -2.0));

        // approaching from the right side
        let wall = Shape::rect(-16.0, 0.0, 16.0, 16.0);
        let c = actor.intersect(-1.5, 0.0, &wall).unwrap();
        assert!(approx(c.mtv.x, 1.5));
        assert!(approx(c.mtv.y, 0.0));
    }

    #[test]
    fn zero_size_and_markers_never_intersect() {
        let solid = Shape::rect(0.0, 0.0, 16.0, 16.0);
        let flat = Shape::rect(4.0, 4.0, 0.0, 8.0);
        let marker = Shape::Marker(Vec2::new(8.0, 8.0));

        assert!(flat.intersect(0.0, 0.0, &solid).is_none());
        assert!(solid.intersect(0.0, 0.0, &flat).is_none());
        assert!(marker.intersect(0.0, 0.0, &solid).is_none());
        assert!(solid.intersect(0.0, 0.0, &marker).is_none());
        assert!(!marker.inside_of(&solid));
        assert!(!marker.contains_point(Vec2::new(8.0, 8.0)));
    }

    #[test]
    fn inside_of_requires_all_vertices() {
        let tile = Shape::rect(0.0, 0.0, 16.0, 16.0);
        assert!(Shape::rect(4.0, 4.0, 8.0, 8.0).inside_of(&tile));
        assert!(Shape::rect(8.0, 8.0, 8.0, 8.0).inside_of(&tile)); // flush corner
        assert!(!Shape::rect(10.0, 4.0, 8.0, 8.0).inside_of(&tile));
    }

    #[test]
    fn vec_length_is_euclidean() {
        let d = Vec2::new(3.0, 4.0) - Vec2::ZERO;
        assert!(approx(d.length(), 5.0));
        assert_eq!(Vec2::new(1.0, 2.0) + Vec2::new(2.0, 3.0), Vec2::new(3.0, 5.0));
    }
}
