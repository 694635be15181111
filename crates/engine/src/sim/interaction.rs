use super::entity::{Actor, Monster, Treasure};
use super::TILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    MonsterKilled,
    PlayerKilled,
}

/// Inclusive-edge overlap of two TILE-sized boxes given by their top-left corners. Boxes that
/// only touch along an edge or a corner count as overlapping.
pub fn boxes_overlap(ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    bx <= ax + TILE && ax <= bx + TILE && by <= ay + TILE && ay <= by + TILE
}

/// Returns true only on the tick the treasure is picked up.
pub fn try_collect(player: &Actor, treasure: &mut Treasure) -> bool {
    if treasure.collected || !boxes_overlap(player.x, player.y, treasure.x, treasure.y) {
        return false;
    }
    treasure.collected = true;
    true
}

/// Player versus one monster. A player coming down onto a monster whose top sits more than half
/// a tile below the player's top kills it; any other contact kills the player.
pub fn resolve_contact(player: &mut Actor, monster: &mut Monster) -> Option<ContactOutcome> {
    if monster.dead || !boxes_overlap(player.x, player.y, monster.actor.x, monster.actor.y) {
        return None;
    }
    if player.dy > 0.0 && monster.actor.y - player.y > TILE / 2.0 {
        monster.dead = true;
        Some(ContactOutcome::MonsterKilled)
    } else {
        player.respawn();
        Some(ContactOutcome::PlayerKilled)
    }
}
