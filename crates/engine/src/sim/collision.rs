use super::entity::Actor;
use super::tilemap::{pixel_to_tile, tile_to_pixel, TileMap};
use super::TILE;

/// Solidity of the four tiles an actor box can touch, plus whether the box straddles the
/// boundary to the right (`overlaps_right`) or below (`overlaps_down`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    pub tx: i64,
    pub ty: i64,
    pub cell: bool,
    pub right: bool,
    pub down: bool,
    pub diag: bool,
    pub overlaps_right: bool,
    pub overlaps_down: bool,
}

impl Neighborhood {
    pub fn probe(tiles: &TileMap, x: f64, y: f64) -> Self {
        let tx = pixel_to_tile(x);
        let ty = pixel_to_tile(y);
        Self {
            tx,
            ty,
            cell: tiles.is_solid(tx, ty),
            right: tiles.is_solid(tx + 1, ty),
            down: tiles.is_solid(tx, ty + 1),
            diag: tiles.is_solid(tx + 1, ty + 1),
            overlaps_right: x.rem_euclid(TILE) != 0.0,
            overlaps_down: y.rem_euclid(TILE) != 0.0,
        }
    }

    pub fn supported(&self) -> bool {
        self.down || (self.overlaps_right && self.diag)
    }
}

/// Pushes an actor out of solid tiles along the axes it is moving on, vertical first.
///
/// An axis with exactly zero velocity is never corrected, so an actor resting inside geometry
/// stays there. Returns the neighborhood as it stands after correction, which patrol logic and
/// support detection read.
pub fn resolve_collisions(actor: &mut Actor, tiles: &TileMap) -> Neighborhood {
    let mut hood = Neighborhood::probe(tiles, actor.x, actor.y);

    if actor.dy > 0.0 {
        let lands = (hood.down && !hood.cell) || (hood.diag && !hood.right && hood.overlaps_right);
        if lands {
            actor.y = tile_to_pixel(hood.ty);
            actor.dy = 0.0;
            actor.falling = false;
            actor.jumping = false;
            hood.overlaps_down = false;
        }
    } else if actor.dy < 0.0 {
        let bonks = (hood.cell && !hood.down) || (hood.right && !hood.diag && hood.overlaps_right);
        if bonks {
            actor.y = tile_to_pixel(hood.ty + 1);
            actor.dy = 0.0;
            // Clamped into the row below; the lower pair now sits where the box is.
            hood.cell = hood.down;
            hood.right = hood.diag;
            hood.overlaps_down = false;
        }
    }

    if actor.dx > 0.0 {
        let blocked = (hood.right && !hood.cell) || (hood.diag && !hood.down && hood.overlaps_down);
        if blocked {
            actor.x = tile_to_pixel(hood.tx);
            actor.dx = 0.0;
            hood.overlaps_right = false;
        }
    } else if actor.dx < 0.0 {
        let blocked = (hood.cell && !hood.right) || (hood.down && !hood.diag && hood.overlaps_down);
        if blocked {
            actor.x = tile_to_pixel(hood.tx + 1);
            actor.dx = 0.0;
            hood.overlaps_right = false;
        }
    }

    hood
}

/// Monster patrol: turn around when the way ahead is walled off or has no floor.
///
/// The two checks run in sequence, so a monster boxed in on both sides can turn twice in one
/// tick and keep its starting heading. Returns true if the heading changed.
pub fn apply_patrol_turn(actor: &mut Actor, hood: &Neighborhood) -> bool {
    let before = actor.intents;

    if actor.intents.left && (hood.cell || !hood.down) {
        actor.intents.left = false;
        actor.intents.right = true;
        actor.dx = 0.0;
    }
    if actor.intents.right && (hood.right || !hood.diag) {
        actor.intents.right = false;
        actor.intents.left = true;
        actor.dx = 0.0;
    }

    actor.intents != before
}

pub fn update_support(actor: &mut Actor, hood: &Neighborhood) {
    actor.falling = !hood.supported();
}
