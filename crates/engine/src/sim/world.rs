use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::collision::{apply_patrol_turn, resolve_collisions, update_support};
use super::entity::{Actor, EntityKind, Intents, Monster, Treasure};
use super::interaction::{resolve_contact, try_collect, ContactOutcome};
use super::kinematics::integrate;
use super::tilemap::TileMap;
use crate::hashing::to_hex_lower;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    TreasureCollected { index: usize },
    MonsterKilled { index: usize },
    PlayerKilled { by_monster: usize },
    MonsterTurned { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<TickEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub treasures_collected: u32,
    pub monsters_killed: u32,
    pub player_deaths: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntity {
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
    pub dead: bool,
    pub collected: bool,
}

/// Everything a renderer needs for one frame. Dead monsters are already filtered out;
/// collected treasure is kept with its flag set.
#[derive(Debug, Clone)]
pub struct RenderFrame<'a> {
    pub tiles: &'a TileMap,
    pub entities: Vec<RenderEntity>,
}

#[derive(Debug, Clone)]
pub struct World {
    tiles: Arc<TileMap>,
    player: Actor,
    monsters: Vec<Monster>,
    treasures: Vec<Treasure>,
    tick: u64,
    stats: WorldStats,
}

impl World {
    pub fn new(
        tiles: TileMap,
        player: Actor,
        monsters: Vec<Monster>,
        treasures: Vec<Treasure>,
    ) -> Self {
        Self {
            tiles: Arc::new(tiles),
            player,
            monsters,
            treasures,
            tick: 0,
            stats: WorldStats::default(),
        }
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn player(&self) -> &Actor {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Actor {
        &mut self.player
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn monsters_mut(&mut self) -> &mut [Monster] {
        &mut self.monsters
    }

    pub fn treasures(&self) -> &[Treasure] {
        &self.treasures
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> WorldStats {
        self.stats
    }

    pub fn set_player_intents(&mut self, intents: Intents) {
        self.player.intents = intents;
    }

    /// Runs one fixed step: player physics, monster physics, monster contacts in level order,
    /// then treasure pickup against wherever the player ended up.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        self.tick = self.tick.saturating_add(1);
        let mut events = Vec::new();

        integrate(&mut self.player, dt);
        let hood = resolve_collisions(&mut self.player, &self.tiles);
        update_support(&mut self.player, &hood);

        for (index, monster) in self.monsters.iter_mut().enumerate() {
            if monster.dead {
                continue;
            }
            integrate(&mut monster.actor, dt);
            let hood = resolve_collisions(&mut monster.actor, &self.tiles);
            if apply_patrol_turn(&mut monster.actor, &hood) {
                events.push(TickEvent::MonsterTurned { index });
            }
            update_support(&mut monster.actor, &hood);
        }

        for (index, monster) in self.monsters.iter_mut().enumerate() {
            match resolve_contact(&mut self.player, monster) {
                Some(ContactOutcome::MonsterKilled) => {
                    self.stats.monsters_killed = self.stats.monsters_killed.saturating_add(1);
                    info!(tick = self.tick, monster = index, "monster_killed");
                    events.push(TickEvent::MonsterKilled { index });
                }
                Some(ContactOutcome::PlayerKilled) => {
                    self.stats.player_deaths = self.stats.player_deaths.saturating_add(1);
                    info!(tick = self.tick, monster = index, "player_killed");
                    events.push(TickEvent::PlayerKilled { by_monster: index });
                }
                None => {}
            }
        }

        for (index, treasure) in self.treasures.iter_mut().enumerate() {
            if try_collect(&self.player, treasure) {
                self.stats.treasures_collected = self.stats.treasures_collected.saturating_add(1);
                debug!(tick = self.tick, treasure = index, "treasure_collected");
                events.push(TickEvent::TreasureCollected { index });
            }
        }

        TickReport {
            tick: self.tick,
            events,
        }
    }

    pub fn render_frame(&self) -> RenderFrame<'_> {
        let player = std::iter::once(RenderEntity {
            kind: EntityKind::Player,
            x: self.player.x,
            y: self.player.y,
            dead: false,
            collected: false,
        });
        let monsters = self
            .monsters
            .iter()
            .filter(|monster| !monster.dead)
            .map(|monster| RenderEntity {
                kind: EntityKind::Monster,
                x: monster.actor.x,
                y: monster.actor.y,
                dead: false,
                collected: false,
            });
        let treasures = self.treasures.iter().map(|treasure| RenderEntity {
            kind: EntityKind::Treasure,
            x: treasure.x,
            y: treasure.y,
            dead: false,
            collected: treasure.collected,
        });

        RenderFrame {
            tiles: &self.tiles,
            entities: player.chain(monsters).chain(treasures).collect(),
        }
    }

    /// SHA-256 over every piece of mutable simulation state, as lowercase hex.
    pub fn state_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.tick.to_le_bytes());
        hash_actor(&mut hasher, &self.player);
        for monster in &self.monsters {
            hash_actor(&mut hasher, &monster.actor);
            hasher.update([u8::from(monster.dead)]);
        }
        for treasure in &self.treasures {
            hasher.update(treasure.x.to_bits().to_le_bytes());
            hasher.update(treasure.y.to_bits().to_le_bytes());
            hasher.update([u8::from(treasure.collected)]);
        }
        to_hex_lower(&hasher.finalize())
    }
}

/// Pure form of [`World::tick`]: the input world is left untouched.
pub fn step(world: &World, dt: f64) -> World {
    let mut next = world.clone();
    next.tick(dt);
    next
}

fn hash_actor(hasher: &mut Sha256, actor: &Actor) {
    for value in [actor.x, actor.y, actor.dx, actor.dy, actor.ddx, actor.ddy] {
        hasher.update(value.to_bits().to_le_bytes());
    }
    hasher.update([
        u8::from(actor.intents.left),
        u8::from(actor.intents.right),
        u8::from(actor.intents.jump),
        u8::from(actor.falling),
        u8::from(actor.jumping),
    ]);
}
