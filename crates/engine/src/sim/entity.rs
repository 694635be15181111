use super::{METER, RESPAWN_POINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Monster,
    Treasure,
}

impl EntityKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "player" => Some(Self::Player),
            "monster" => Some(Self::Monster),
            "treasure" => Some(Self::Treasure),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Monster => "monster",
            Self::Treasure => "treasure",
        }
    }
}

/// Per-entity physical constants, in pixels and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    pub gravity: f64,
    pub max_dx: f64,
    pub max_dy: f64,
    pub accel: f64,
    pub friction: f64,
    pub jump: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: METER * 9.8 * 6.0,
            max_dx: METER * 20.0,
            max_dy: METER * 60.0,
            accel: METER * 40.0,
            friction: METER * 60.0,
            jump: METER * 1500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intents {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl Intents {
    pub fn new(left: bool, right: bool, jump: bool) -> Self {
        Self { left, right, jump }
    }
}

/// Kinematic record shared by the player and monsters. `(x, y)` is the top-left corner of a
/// TILE-sized box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub ddx: f64,
    pub ddy: f64,
    pub params: PhysicsParams,
    pub intents: Intents,
    pub falling: bool,
    pub jumping: bool,
}

impl Actor {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            ddx: 0.0,
            ddy: 0.0,
            params: PhysicsParams::default(),
            intents: Intents::default(),
            falling: false,
            jumping: false,
        }
    }

    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    pub fn with_velocity(mut self, dx: f64, dy: f64) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    pub fn with_params(mut self, params: PhysicsParams) -> Self {
        self.params = params;
        self
    }

    /// Hard teleport to the respawn point. Velocity, intents and support flags are untouched.
    pub fn respawn(&mut self) {
        self.x = RESPAWN_POINT.0;
        self.y = RESPAWN_POINT.1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Monster {
    pub actor: Actor,
    pub dead: bool,
}

impl Monster {
    pub fn new(actor: Actor) -> Self {
        Self { actor, dead: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Treasure {
    pub x: f64,
    pub y: f64,
    pub collected: bool,
}

impl Treasure {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            collected: false,
        }
    }
}
