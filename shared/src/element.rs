//! Transient and static world elements: projectiles and obstacles.

use crate::bounds::{RectBounds, Torus, WorldRect};
use crate::{BULLET_DAMAGE, BULLET_SIZE, BULLET_SPEED};

/// A fired projectile. Direction is fixed at spawn; the per-tick step is
/// precomputed from the angle so every advance is the same integer offset.
#[derive(Debug, Clone)]
pub struct Projectile {
    x: i32,
    y: i32,
    angle: f64,
    step_x: i32,
    step_y: i32,
    damage: i32,
    bounds: RectBounds,
}

impl Projectile {
    /// `x`/`y` is the projectile's top-left corner.
    pub fn new(x: i32, y: i32, angle: f64, torus: &Torus) -> Self {
        let x = torus.wrap_x(x);
        let y = torus.wrap_y(y);
        Self {
            x,
            y,
            angle,
            step_x: (angle.cos() * BULLET_SPEED as f64).round() as i32,
            step_y: (angle.sin() * BULLET_SPEED as f64).round() as i32,
            damage: BULLET_DAMAGE,
            bounds: Self::bounds_at(x, y, torus),
        }
    }

    // Redraw rect covers the previous position too, three sizes centered
    // on the collision rect.
    fn bounds_at(x: i32, y: i32, torus: &Torus) -> RectBounds {
        let rect = WorldRect::new(x, y, BULLET_SIZE, BULLET_SIZE);
        let redraw = WorldRect::new(
            x - BULLET_SIZE,
            y - BULLET_SIZE,
            BULLET_SIZE * 3,
            BULLET_SIZE * 3,
        );
        RectBounds::new(vec![rect], redraw, torus)
    }

    /// Steps the projectile along its direction, wrapping at the seams.
    pub fn advance(&mut self, torus: &Torus) {
        self.x = torus.wrap_x(self.x + self.step_x);
        self.y = torus.wrap_y(self.y + self.step_y);
        self.bounds = Self::bounds_at(self.x, self.y, torus);
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn bounds(&self) -> &RectBounds {
        &self.bounds
    }
}

/// An immovable rectangle, built once from the layout and never mutated.
#[derive(Debug, Clone)]
pub struct StaticObstacle {
    rect: WorldRect,
    bounds: RectBounds,
}

impl StaticObstacle {
    pub fn new(rect: WorldRect, torus: &Torus) -> Self {
        Self {
            rect,
            bounds: RectBounds::from_rect(rect, torus),
        }
    }

    pub fn rect(&self) -> &WorldRect {
        &self.rect
    }

    pub fn bounds(&self) -> &RectBounds {
        &self.bounds
    }
}

/// Everything in the world that is not a player.
#[derive(Debug, Clone)]
pub enum Element {
    Projectile(Projectile),
    Obstacle(StaticObstacle),
}

impl Element {
    pub fn bounds(&self) -> &RectBounds {
        match self {
            Element::Projectile(p) => p.bounds(),
            Element::Obstacle(o) => o.bounds(),
        }
    }

    pub fn is_projectile(&self) -> bool {
        matches!(self, Element::Projectile(_))
    }
}
