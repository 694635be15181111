use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::hashing::sha256_hex;
use crate::sim::{
    Actor, EntityKind, Intents, Monster, TileMap, TileMapError, Treasure, World, RESPAWN_POINT,
    TILE,
};

const TILE_LAYER_INDEX: usize = 0;
const OBJECT_LAYER_INDEX: usize = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct LevelData {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tilewidth: Option<u32>,
    #[serde(default)]
    pub tileheight: Option<u32>,
    pub layers: Vec<LayerData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<u16>>,
    #[serde(default)]
    pub objects: Option<Vec<ObjectData>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub properties: ObjectProperties,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ObjectProperties {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level has no tile data in layers[0]")]
    MissingTileLayer,
    #[error("level has no object list in layers[1]")]
    MissingObjectLayer,
    #[error("invalid tile layer: {0}")]
    TileMap(#[from] TileMapError),
    #[error("unsupported tile size {width}x{height}; only {expected}x{expected} is supported")]
    UnsupportedTileSize {
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("object {index} has unknown type '{kind}'")]
    UnknownObjectKind { index: usize, kind: String },
    #[error("object {index} at ({x}, {y}) lies outside the {width}x{height} pixel map")]
    ObjectOutOfBounds {
        index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    #[error("level has no player object")]
    MissingPlayer,
    #[error("object {index} is a second player; the first is object {first_index}")]
    DuplicatePlayer { first_index: usize, index: usize },
}

pub fn parse_level_json(raw: &str) -> Result<LevelData, LevelError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelData>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        LevelError::Parse {
            path,
            source: error.into_inner(),
        }
    })
}

/// Reads, parses and validates a level file into a ready-to-tick world.
pub fn load_level_file(path: &Path) -> Result<World, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let level = parse_level_json(&raw)?;
    let world = build_world(&level)?;

    info!(
        path = %path.display(),
        width = level.width,
        height = level.height,
        monsters = world.monsters().len(),
        treasures = world.treasures().len(),
        sha256 = %sha256_hex(raw.as_bytes()),
        "level_loaded"
    );
    Ok(world)
}

pub fn build_world(level: &LevelData) -> Result<World, LevelError> {
    check_tile_size(level)?;

    let data = level
        .layers
        .get(TILE_LAYER_INDEX)
        .and_then(|layer| layer.data.as_ref())
        .ok_or(LevelError::MissingTileLayer)?;
    let objects = level
        .layers
        .get(OBJECT_LAYER_INDEX)
        .and_then(|layer| layer.objects.as_ref())
        .ok_or(LevelError::MissingObjectLayer)?;
    let tiles = TileMap::new(level.width, level.height, data.clone())?;

    let mut player: Option<(usize, Actor)> = None;
    let mut monsters = Vec::new();
    let mut treasures = Vec::new();

    for (index, object) in objects.iter().enumerate() {
        let kind =
            EntityKind::from_tag(&object.kind).ok_or_else(|| LevelError::UnknownObjectKind {
                index,
                kind: object.kind.clone(),
            })?;
        let (x, y) = object_position(index, object, &tiles)?;
        let intents = Intents::new(object.properties.left, object.properties.right, false);

        match kind {
            EntityKind::Player => {
                if let Some((first_index, _)) = player {
                    return Err(LevelError::DuplicatePlayer { first_index, index });
                }
                player = Some((index, Actor::at(x, y).with_intents(intents)));
            }
            EntityKind::Monster => {
                monsters.push(Monster::new(Actor::at(x, y).with_intents(intents)));
            }
            EntityKind::Treasure => treasures.push(Treasure::at(x, y)),
        }
    }

    let (_, player) = player.ok_or(LevelError::MissingPlayer)?;
    Ok(World::new(tiles, player, monsters, treasures))
}

fn check_tile_size(level: &LevelData) -> Result<(), LevelError> {
    let expected = TILE as u32;
    let width = level.tilewidth.unwrap_or(expected);
    let height = level.tileheight.unwrap_or(expected);
    if width != expected || height != expected {
        return Err(LevelError::UnsupportedTileSize {
            width,
            height,
            expected,
        });
    }
    Ok(())
}

// Missing coordinates fall back to the respawn point. An explicit 0 is kept.
fn object_position(
    index: usize,
    object: &ObjectData,
    tiles: &TileMap,
) -> Result<(f64, f64), LevelError> {
    let x = object.x.unwrap_or(RESPAWN_POINT.0);
    let y = object.y.unwrap_or(RESPAWN_POINT.1);
    let max_x = tiles.pixel_width() - TILE;
    let max_y = tiles.pixel_height() - TILE;

    let inside = (0.0..=max_x).contains(&x) && (0.0..=max_y).contains(&y);
    if !inside {
        return Err(LevelError::ObjectOutOfBounds {
            index,
            x,
            y,
            width: tiles.pixel_width(),
            height: tiles.pixel_height(),
        });
    }
    Ok((x, y))
}
