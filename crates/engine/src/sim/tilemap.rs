use thiserror::Error;

use super::TILE;

/// Tile grid convention:
/// - tile (0,0) is the top-left cell and its top-left pixel is world (0,0).
/// - y grows downward; tile (x,y) covers pixels `[x*TILE, (x+1)*TILE) x [y*TILE, (y+1)*TILE)`.
/// - code 0 is passable, every other code is solid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileMapError {
    #[error("tile map must be at least 1x1, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

impl TileMap {
    pub fn new(width: u32, height: u32, tiles: Vec<u16>) -> Result<Self, TileMapError> {
        if width == 0 || height == 0 {
            return Err(TileMapError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TileMapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_width(&self) -> f64 {
        f64::from(self.width) * TILE
    }

    pub fn pixel_height(&self) -> f64 {
        f64::from(self.height) * TILE
    }

    pub fn tiles(&self) -> &[u16] {
        &self.tiles
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Signed lookup used by the collision probe. Anything off the grid reads as empty.
    pub fn code_at(&self, tx: i64, ty: i64) -> u16 {
        match (u32::try_from(tx), u32::try_from(ty)) {
            (Ok(x), Ok(y)) => self.tile_at(x, y).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn is_solid(&self, tx: i64, ty: i64) -> bool {
        self.code_at(tx, ty) != 0
    }
}

pub fn pixel_to_tile(p: f64) -> i64 {
    (p / TILE).floor() as i64
}

pub fn tile_to_pixel(t: i64) -> f64 {
    t as f64 * TILE
}
