//! Authoritative world state: players, transient elements, and the collision
//! queries that validate every state-changing action.

use std::time::Instant;

use log::debug;

use crate::bounds::{Torus, WorldRect};
use crate::element::{Element, Projectile, StaticObstacle};
use crate::player::Player;
use crate::protocol::PlayerRecord;
use crate::{BULLET_SIZE, PLAYER_SIZE};

/// Arena description consumed at session start: dimensions, where players
/// spawn, and the static obstacles. Supplied by the host; the world never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Layout {
    pub width: i32,
    pub height: i32,
    /// Spawn points used in roster order, cycling when there are more
    /// players than points. An empty list places everyone at the origin.
    pub spawns: Vec<(i32, i32)>,
    pub obstacles: Vec<WorldRect>,
}

impl Layout {
    /// The built-in arena. The server binary hosts it and headless clients
    /// mirror it, so both sides simulate the same obstacles and spawns.
    pub fn default_arena() -> Self {
        Self {
            width: crate::MAP_WIDTH,
            height: crate::MAP_HEIGHT,
            spawns: vec![
                (20, 20),
                (20, 320),
                (320, 20),
                (950, 950),
                (950, 20),
                (20, 950),
                (500, 100),
                (100, 500),
                (900, 500),
                (500, 900),
            ],
            obstacles: vec![
                WorldRect::new(200, 200, 20, 250),
                WorldRect::new(600, 150, 250, 20),
                WorldRect::new(450, 450, 100, 100),
                WorldRect::new(150, 700, 300, 20),
                WorldRect::new(780, 600, 20, 300),
            ],
        }
    }
}

/// Identifies one collidable entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Player(usize),
    Element(usize),
}

/// The simulation state. Player index is the wire identity; it never shifts
/// while the world is live (dead players are deactivated in place).
#[derive(Debug)]
pub struct World {
    torus: Torus,
    players: Vec<Player>,
    elements: Vec<Element>,
}

impl World {
    /// Builds a world from the layout and the joined roster. Players are
    /// placed at the layout's spawn points in roster order.
    pub fn new(layout: &Layout, roster: &[PlayerRecord]) -> Self {
        let torus = Torus::new(layout.width, layout.height);
        let players = roster
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mut player = Player::from_record(record, &torus);
                let (sx, sy) = if layout.spawns.is_empty() {
                    (0, 0)
                } else {
                    layout.spawns[i % layout.spawns.len()]
                };
                player.set_top_left(sx, sy, &torus);
                player
            })
            .collect();
        let elements = layout
            .obstacles
            .iter()
            .map(|rect| Element::Obstacle(StaticObstacle::new(*rect, &torus)))
            .collect();
        Self {
            torus,
            players,
            elements,
        }
    }

    pub fn torus(&self) -> &Torus {
        &self.torus
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn player(&self, index: usize) -> &Player {
        &self.players[index]
    }

    /// Moves a player by a wrapped offset. With `validate`, the move is
    /// collision-checked and reverted on any hit; the revert is exact because
    /// wrapped translation by `(-dx, -dy)` is the modular inverse. Without
    /// `validate` the move is applied unconditionally (replaying an already
    /// validated remote event).
    ///
    /// Returns whether the player moved. An inactive player never moves.
    pub fn translate_player(&mut self, index: usize, dx: i32, dy: i32, validate: bool) -> bool {
        if !self.players[index].is_active() {
            return false;
        }
        self.players[index].translate(dx, dy, &self.torus);
        if validate && self.collides(Hit::Player(index)).is_some() {
            self.players[index].translate(-dx, -dy, &self.torus);
            debug!("rejected move ({},{}) for player {}", dx, dy, index);
            return false;
        }
        true
    }

    /// Sets a player's facing. Rotation has no collision consequences and
    /// always succeeds; inactive players are left untouched.
    pub fn rotate_player(&mut self, index: usize, angle: f64) {
        if self.players[index].is_active() {
            self.players[index].set_angle(angle);
        }
    }

    /// Fires a projectile from the indexed player if the cooldown allows it.
    /// Returns the spawned projectile so callers can relay it.
    pub fn player_shoot(&mut self, index: usize) -> Option<Projectile> {
        self.player_shoot_at(index, Instant::now())
    }

    /// Cooldown-gated variant taking an explicit clock reading.
    pub fn player_shoot_at(&mut self, index: usize, now: Instant) -> Option<Projectile> {
        if !self.players[index].is_active() || !self.players[index].ready_to_fire(now) {
            return None;
        }
        self.players[index].record_shot(now);
        Some(self.spawn_projectile(index))
    }

    /// Spawns a projectile for the indexed player unconditionally, bypassing
    /// the cooldown. Used when replaying a shot the host already accepted.
    pub fn spawn_projectile(&mut self, index: usize) -> Projectile {
        let player = &self.players[index];
        let (cx, cy) = player.center();
        let angle = player.angle();
        // Anchor just outside the shooter so the projectile never collides
        // with its own player on the spawn tick.
        let reach = (PLAYER_SIZE / 2 + BULLET_SIZE) as f64;
        let px = cx + (angle.cos() * reach).round() as i32 - BULLET_SIZE / 2;
        let py = cy + (angle.sin() * reach).round() as i32 - BULLET_SIZE / 2;
        let projectile = Projectile::new(px, py, angle, &self.torus);
        self.elements.push(Element::Projectile(projectile.clone()));
        projectile
    }

    /// Steps every projectile one tick and resolves the resulting hits:
    /// a player hit takes damage (deactivating at zero health) and destroys
    /// the projectile, two projectiles destroy each other, an obstacle
    /// destroys the projectile. Entries removed mid-scan are flagged first
    /// and swept at the end so the scan neither skips nor double-visits.
    pub fn advance_transient_elements(&mut self) {
        for element in &mut self.elements {
            if let Element::Projectile(projectile) = element {
                projectile.advance(&self.torus);
            }
        }

        let mut removed = vec![false; self.elements.len()];
        for i in 0..self.elements.len() {
            if removed[i] || !self.elements[i].is_projectile() {
                continue;
            }
            let damage = match &self.elements[i] {
                Element::Projectile(p) => p.damage(),
                Element::Obstacle(_) => continue,
            };

            let mut hit_player = None;
            for (j, player) in self.players.iter().enumerate() {
                if player.is_active()
                    && self.elements[i]
                        .bounds()
                        .intersects(player.bounds(), &self.torus)
                {
                    hit_player = Some(j);
                    break;
                }
            }
            if let Some(j) = hit_player {
                self.players[j].apply_damage(damage);
                removed[i] = true;
                continue;
            }

            for j in 0..self.elements.len() {
                if j == i || removed[j] {
                    continue;
                }
                if self.elements[i]
                    .bounds()
                    .intersects(self.elements[j].bounds(), &self.torus)
                {
                    removed[i] = true;
                    if self.elements[j].is_projectile() {
                        removed[j] = true;
                    }
                    break;
                }
            }
        }

        let mut index = 0;
        self.elements.retain(|_| {
            let keep = !removed[index];
            index += 1;
            keep
        });
    }

    /// First collision partner of the given entity, or `None`. Active players
    /// are scanned before elements; the entity never matches itself.
    pub fn collides(&self, collider: Hit) -> Option<Hit> {
        let bounds = match collider {
            Hit::Player(i) => self.players[i].bounds(),
            Hit::Element(i) => self.elements[i].bounds(),
        };
        for (j, player) in self.players.iter().enumerate() {
            if collider == Hit::Player(j) || !player.is_active() {
                continue;
            }
            if bounds.intersects(player.bounds(), &self.torus) {
                return Some(Hit::Player(j));
            }
        }
        for (j, element) in self.elements.iter().enumerate() {
            if collider == Hit::Element(j) {
                continue;
            }
            if bounds.intersects(element.bounds(), &self.torus) {
                return Some(Hit::Element(j));
            }
        }
        None
    }

    /// Marks a player inactive (disconnection mid-game). Indices of the
    /// remaining players are unchanged.
    pub fn deactivate_player(&mut self, index: usize) {
        self.players[index].deactivate();
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    pub fn projectile_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_projectile()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BULLET_DAMAGE, BULLET_SPEED, MAX_HEALTH, RELOAD_INTERVAL};
    use std::f64::consts::PI;
    use std::time::Instant;

    fn layout() -> Layout {
        Layout {
            width: 1000,
            height: 1000,
            spawns: vec![(20, 20), (20, 320), (320, 20)],
            obstacles: Vec::new(),
        }
    }

    fn records(n: usize) -> Vec<PlayerRecord> {
        (0..n)
            .map(|i| PlayerRecord {
                name: format!("p{}", i),
                image_path: "img.png".to_string(),
                x: 0,
                y: 0,
            })
            .collect()
    }

    #[test]
    fn test_players_placed_at_spawns() {
        let world = World::new(&layout(), &records(3));
        assert_eq!(world.player(0).position(), (20, 20));
        assert_eq!(world.player(1).position(), (20, 320));
        assert_eq!(world.player(2).position(), (320, 20));
    }

    #[test]
    fn test_spawnless_layout_places_players_at_origin() {
        let mut arena = layout();
        arena.spawns.clear();
        let world = World::new(&arena, &records(2));
        assert_eq!(world.player(0).position(), (0, 0));
        assert_eq!(world.player(1).position(), (0, 0));
    }

    #[test]
    fn test_default_arena_spawns_are_clear() {
        let arena = Layout::default_arena();
        assert!(arena.spawns.len() >= crate::MAX_PLAYERS);
        let world = World::new(&arena, &records(crate::MAX_PLAYERS));
        for i in 0..crate::MAX_PLAYERS {
            assert_eq!(world.collides(Hit::Player(i)), None, "spawn {} is blocked", i);
        }
    }

    #[test]
    fn test_validated_translate_accepts_free_move() {
        let mut world = World::new(&layout(), &records(2));
        assert!(world.translate_player(0, 5, 0, true));
        assert_eq!(world.player(0).position(), (25, 20));
    }

    #[test]
    fn test_validated_translate_reverts_on_player_collision() {
        let mut world = World::new(&layout(), &records(2));
        // Walk player 0 down until just above player 1, then push into it.
        assert!(world.translate_player(0, 0, 265, true));
        assert_eq!(world.player(0).position(), (20, 285));
        assert!(!world.translate_player(0, 0, 10, true));
        assert_eq!(world.player(0).position(), (20, 285));
    }

    #[test]
    fn test_unvalidated_translate_ignores_collisions() {
        let mut world = World::new(&layout(), &records(2));
        assert!(world.translate_player(0, 0, 300, false));
        assert_eq!(world.player(0).position(), (20, 320));
    }

    #[test]
    fn test_translate_rejected_against_obstacle() {
        let mut arena = layout();
        arena.obstacles.push(WorldRect::new(60, 10, 20, 100));
        let mut world = World::new(&arena, &records(2));
        assert!(world.translate_player(0, 5, 0, true));
        assert!(world.translate_player(0, 5, 0, true));
        // Next step would put the 30-wide player into the wall at x=60.
        assert!(!world.translate_player(0, 5, 0, true));
        assert_eq!(world.player(0).position(), (30, 20));
    }

    #[test]
    fn test_validated_translate_across_seam() {
        let mut world = World::new(&layout(), &records(2));
        assert!(world.translate_player(0, -25, 0, true));
        assert_eq!(world.player(0).position(), (995, 20));
    }

    #[test]
    fn test_inactive_player_cannot_move() {
        let mut world = World::new(&layout(), &records(2));
        world.deactivate_player(0);
        assert!(!world.translate_player(0, 5, 0, true));
        assert_eq!(world.player(0).position(), (20, 20));
    }

    #[test]
    fn test_rotate_always_succeeds() {
        let mut world = World::new(&layout(), &records(2));
        world.rotate_player(0, PI);
        assert_eq!(world.player(0).angle(), PI);
        world.rotate_player(0, -7.5);
        assert_eq!(world.player(0).angle(), -7.5);
    }

    #[test]
    fn test_shoot_respects_cooldown() {
        let mut world = World::new(&layout(), &records(2));
        let now = Instant::now();
        assert!(world.player_shoot_at(0, now).is_some());
        assert!(world.player_shoot_at(0, now).is_none());
        assert!(world
            .player_shoot_at(0, now + RELOAD_INTERVAL)
            .is_some());
        assert_eq!(world.projectile_count(), 2);
    }

    #[test]
    fn test_projectile_spawns_clear_of_shooter() {
        let mut world = World::new(&layout(), &records(2));
        let now = Instant::now();
        world.player_shoot_at(0, now).unwrap();
        world.advance_transient_elements();
        // Shooter unharmed, projectile flying away.
        assert_eq!(world.player(0).health(), MAX_HEALTH);
        assert_eq!(world.projectile_count(), 1);
    }

    #[test]
    fn test_projectile_damages_and_despawns() {
        let mut world = World::new(&layout(), &records(2));
        // Aim player 0 straight down at player 1 (300 pixels below).
        world.rotate_player(0, std::f64::consts::FRAC_PI_2);
        world.player_shoot_at(0, Instant::now()).unwrap();
        let mut ticks = 0;
        while world.projectile_count() > 0 && ticks < 400 / BULLET_SPEED {
            world.advance_transient_elements();
            ticks += 1;
        }
        assert_eq!(world.projectile_count(), 0);
        assert_eq!(world.player(1).health(), MAX_HEALTH - BULLET_DAMAGE);
    }

    #[test]
    fn test_projectile_stopped_by_obstacle() {
        let mut arena = layout();
        arena.obstacles.push(WorldRect::new(100, 0, 10, 1000));
        let mut world = World::new(&arena, &records(2));
        world.player_shoot_at(0, Instant::now()).unwrap();
        for _ in 0..20 {
            world.advance_transient_elements();
        }
        assert_eq!(world.projectile_count(), 0);
        assert_eq!(world.player(1).health(), MAX_HEALTH);
    }

    #[test]
    fn test_head_on_projectiles_destroy_each_other() {
        let mut arena = layout();
        // Spawn separation chosen so the opposing projectiles meet exactly
        // instead of stepping past each other between ticks.
        arena.spawns = vec![(20, 20), (20, 300)];
        let mut world = World::new(&arena, &records(2));
        // Face the players at each other along the spawn column.
        world.rotate_player(0, std::f64::consts::FRAC_PI_2);
        world.rotate_player(1, -std::f64::consts::FRAC_PI_2);
        let now = Instant::now();
        world.player_shoot_at(0, now).unwrap();
        world.player_shoot_at(1, now).unwrap();
        for _ in 0..30 {
            world.advance_transient_elements();
        }
        assert_eq!(world.projectile_count(), 0);
        assert_eq!(world.player(0).health(), MAX_HEALTH);
        assert_eq!(world.player(1).health(), MAX_HEALTH);
    }

    #[test]
    fn test_collides_excludes_self() {
        let world = World::new(&layout(), &records(3));
        assert_eq!(world.collides(Hit::Player(0)), None);
    }

    #[test]
    fn test_collides_ignores_inactive_players() {
        let mut world = World::new(&layout(), &records(2));
        world.deactivate_player(1);
        assert!(world.translate_player(0, 0, 300, true));
        assert_eq!(world.collides(Hit::Player(0)), None);
    }

    #[test]
    fn test_active_player_count() {
        let mut world = World::new(&layout(), &records(3));
        assert_eq!(world.active_player_count(), 3);
        world.deactivate_player(1);
        assert_eq!(world.active_player_count(), 2);
    }
}
