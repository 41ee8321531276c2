//! Broad-phase collision bounds for a wrapping (toroidal) coordinate space.
//!
//! Every entity carries a [`RectBounds`]: one or more axis-aligned collision
//! rectangles plus a single aggregate redraw rectangle. Because the world
//! wraps at its width and height, an entity whose extent hangs over the right
//! or bottom seam occupies space on both sides of it. Intersection queries
//! therefore test each rectangle together with copies shifted by `-W`, `-H`,
//! and `-W,-H` whenever the rectangle crosses the corresponding seam.
//!
//! The rectangles here are the collision shape of record. There is no finer
//! narrow-phase test in the authoritative path.

/// An axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl WorldRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Standard AABB overlap test. Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &WorldRect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    fn shifted(&self, dx: i32, dy: i32) -> WorldRect {
        WorldRect::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// The wrap moduli of the world. Positions live in `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Torus {
    pub width: i32,
    pub height: i32,
}

impl Torus {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Wraps an x coordinate into `[0, width)`. Adding the modulus before
    /// taking the remainder keeps negative inputs in range.
    pub fn wrap_x(&self, x: i32) -> i32 {
        ((x % self.width) + self.width) % self.width
    }

    /// Wraps a y coordinate into `[0, height)`.
    pub fn wrap_y(&self, y: i32) -> i32 {
        ((y % self.height) + self.height) % self.height
    }
}

/// Collision and redraw rectangles for one entity.
///
/// `wraps_x`/`wraps_y` record whether the entity's extent crosses the world
/// seam; they decide which translated copies the wrap expansion produces.
#[derive(Debug, Clone)]
pub struct RectBounds {
    rects: Vec<WorldRect>,
    redraw: WorldRect,
    wraps_x: bool,
    wraps_y: bool,
}

impl RectBounds {
    /// Builds bounds from a set of collision rectangles and a redraw
    /// rectangle. The wrap flags are derived from the collision extent.
    pub fn new(rects: Vec<WorldRect>, redraw: WorldRect, torus: &Torus) -> Self {
        let wraps_x = rects.iter().any(|r| r.x + r.w >= torus.width);
        let wraps_y = rects.iter().any(|r| r.y + r.h >= torus.height);
        Self {
            rects,
            redraw,
            wraps_x,
            wraps_y,
        }
    }

    /// Convenience constructor for the common single-rectangle case, where
    /// the redraw area is the collision rectangle itself.
    pub fn from_rect(rect: WorldRect, torus: &Torus) -> Self {
        Self::new(vec![rect], rect, torus)
    }

    pub fn rects(&self) -> &[WorldRect] {
        &self.rects
    }

    pub fn redraw_rect(&self) -> &WorldRect {
        &self.redraw
    }

    pub fn wraps_x(&self) -> bool {
        self.wraps_x
    }

    pub fn wraps_y(&self) -> bool {
        self.wraps_y
    }

    /// True when any collision rectangle of `self` overlaps any collision
    /// rectangle of `other`, taking seam wrapping into account.
    ///
    /// Symmetric. Never queried reflexively by the world; by construction
    /// `a.intersects(a)` would be true.
    pub fn intersects(&self, other: &RectBounds, torus: &Torus) -> bool {
        for a in self.rects.iter().flat_map(|r| wrap_expand(r, torus)) {
            for b in other.rects.iter().flat_map(|r| wrap_expand(r, torus)) {
                if a.overlaps(&b) {
                    return true;
                }
            }
        }
        false
    }

    /// Runs the wrap-expansion overlap test over the redraw rectangles
    /// instead of the collision rectangles.
    ///
    /// Answers "does repainting this entity's area also require repainting
    /// the other entity". Read-only helper for presentation code; it has no
    /// bearing on collision truth.
    pub fn draw_rect_intersects(&self, other: &RectBounds, torus: &Torus) -> bool {
        for a in wrap_expand(&self.redraw, torus) {
            for b in wrap_expand(&other.redraw, torus) {
                if a.overlaps(&b) {
                    return true;
                }
            }
        }
        false
    }
}

/// The rectangle plus its seam-shifted copies: `-W`, `-H`, and `-W,-H`,
/// included only when the rectangle hangs over the corresponding seam.
fn wrap_expand(rect: &WorldRect, torus: &Torus) -> Vec<WorldRect> {
    let over_x = rect.x + rect.w >= torus.width;
    let over_y = rect.y + rect.h >= torus.height;
    let mut rects = vec![*rect];
    if over_x {
        rects.push(rect.shifted(-torus.width, 0));
    }
    if over_y {
        rects.push(rect.shifted(0, -torus.height));
    }
    if over_x && over_y {
        rects.push(rect.shifted(-torus.width, -torus.height));
    }
    rects
}
