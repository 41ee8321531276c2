//! The player entity: position, facing, health, and derived collision bounds.

use std::time::Instant;

use log::info;

use crate::bounds::{RectBounds, Torus, WorldRect};
use crate::protocol::PlayerRecord;
use crate::{MAX_HEALTH, PLAYER_SIZE, PLAYER_SPEED, RELOAD_INTERVAL};

/// One participant in the world. Bounds are recomputed on every position
/// change so collision queries always see the current extent.
#[derive(Debug, Clone)]
pub struct Player {
    name: String,
    image_path: String,
    x: i32,
    y: i32,
    angle: f64,
    speed: i32,
    health: i32,
    active: bool,
    bounds: RectBounds,
    last_shot: Option<Instant>,
}

impl Player {
    pub fn new(name: String, image_path: String, x: i32, y: i32, torus: &Torus) -> Self {
        let x = torus.wrap_x(x);
        let y = torus.wrap_y(y);
        Self {
            name,
            image_path,
            x,
            y,
            angle: 0.0,
            speed: PLAYER_SPEED,
            health: MAX_HEALTH,
            active: true,
            bounds: Self::bounds_at(x, y, torus),
            last_shot: None,
        }
    }

    /// Reconstructs a player from its wire record.
    pub fn from_record(record: &PlayerRecord, torus: &Torus) -> Self {
        Self::new(
            record.name.clone(),
            record.image_path.clone(),
            record.x,
            record.y,
            torus,
        )
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            name: self.name.clone(),
            image_path: self.image_path.clone(),
            x: self.x,
            y: self.y,
        }
    }

    fn bounds_at(x: i32, y: i32, torus: &Torus) -> RectBounds {
        RectBounds::from_rect(WorldRect::new(x, y, PLAYER_SIZE, PLAYER_SIZE), torus)
    }

    /// Places the player at a wrapped top-left position and rebuilds bounds.
    pub fn set_top_left(&mut self, x: i32, y: i32, torus: &Torus) {
        self.x = torus.wrap_x(x);
        self.y = torus.wrap_y(y);
        self.bounds = Self::bounds_at(self.x, self.y, torus);
    }

    /// Moves by a wrapped offset. Translating by `(-dx, -dy)` afterwards
    /// restores the original position exactly, which is what the validation
    /// revert path relies on.
    pub fn translate(&mut self, dx: i32, dy: i32, torus: &Torus) {
        self.set_top_left(self.x + dx, self.y + dy, torus);
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    /// Subtracts damage, deactivating the player when health reaches zero.
    pub fn apply_damage(&mut self, damage: i32) {
        self.health = (self.health - damage).max(0);
        if self.health == 0 && self.active {
            self.active = false;
            info!("player '{}' eliminated", self.name);
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether the fire cooldown has elapsed since the last shot.
    pub fn ready_to_fire(&self, now: Instant) -> bool {
        match self.last_shot {
            Some(last) => now.duration_since(last) >= RELOAD_INTERVAL,
            None => true,
        }
    }

    pub fn record_shot(&mut self, now: Instant) {
        self.last_shot = Some(now);
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + PLAYER_SIZE / 2, self.y + PLAYER_SIZE / 2)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn bounds(&self) -> &RectBounds {
        &self.bounds
    }
}
