use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::sim::{EntityKind, RenderEntity, RenderFrame, TILE};

pub const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xff];
pub const YELLOW: [u8; 4] = [0xec, 0xd0, 0x78, 0xff];
pub const BRICK: [u8; 4] = [0xd9, 0x5b, 0x43, 0xff];
pub const PINK: [u8; 4] = [0xc0, 0x29, 0x42, 0xff];
pub const PURPLE: [u8; 4] = [0x54, 0x24, 0x37, 0xff];
pub const GREY: [u8; 4] = [0x33, 0x33, 0x33, 0xff];
pub const SLATE: [u8; 4] = [0x53, 0x77, 0x7a, 0xff];

const TILE_PALETTE: [[u8; 4]; 6] = [BLACK, YELLOW, BRICK, PINK, PURPLE, GREY];
const LETTERBOX_COLOR: [u8; 4] = [12, 12, 14, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Viewport {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
}

/// Uniform scale plus centering offset that fits the whole map inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MapToScreen {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl MapToScreen {
    fn fit(map_width: f64, map_height: f64, viewport: Viewport) -> Option<Self> {
        if map_width <= 0.0 || map_height <= 0.0 || viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let scale = (viewport.width as f64 / map_width).min(viewport.height as f64 / map_height);
        Some(Self {
            scale,
            offset_x: ((viewport.width as f64 - map_width * scale) / 2.0).floor(),
            offset_y: ((viewport.height as f64 - map_height * scale) / 2.0).floor(),
        })
    }

    // Right and bottom edges are exclusive, so neighbouring tiles share no pixels.
    fn rect(&self, x: f64, y: f64, size: f64) -> ScreenRectPx {
        ScreenRectPx {
            left: (self.offset_x + x * self.scale).floor() as i32,
            right: (self.offset_x + (x + size) * self.scale).floor() as i32,
            top: (self.offset_y + y * self.scale).floor() as i32,
            bottom: (self.offset_y + (y + size) * self.scale).floor() as i32,
        }
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width.max(1), height.max(1), surface)
    }

    pub fn render(&mut self, scene: &RenderFrame<'_>) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        draw_frame(
            self.pixels.frame_mut(),
            self.viewport.width,
            self.viewport.height,
            scene,
        );
        self.pixels.render()
    }
}

pub fn tile_color(code: u16) -> [u8; 4] {
    TILE_PALETTE
        .get(usize::from(code))
        .copied()
        .unwrap_or(SLATE)
}

fn entity_color(kind: EntityKind) -> [u8; 4] {
    match kind {
        EntityKind::Player => PINK,
        EntityKind::Monster => PURPLE,
        EntityKind::Treasure => YELLOW,
    }
}

fn entity_visible(entity: &RenderEntity) -> bool {
    !entity.dead && !entity.collected
}

/// Paints one frame into an RGBA buffer: letterbox, tiles, then entities in frame order.
pub fn draw_frame(frame: &mut [u8], width: u32, height: u32, scene: &RenderFrame<'_>) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&LETTERBOX_COLOR);
    }

    let tiles = scene.tiles;
    let viewport = Viewport { width, height };
    let Some(mapping) = MapToScreen::fit(tiles.pixel_width(), tiles.pixel_height(), viewport)
    else {
        return;
    };

    for ty in 0..tiles.height() {
        for tx in 0..tiles.width() {
            let code = tiles.tile_at(tx, ty).unwrap_or(0);
            let rect = mapping.rect(tx as f64 * TILE, ty as f64 * TILE, TILE);
            fill_rect_clipped(frame, width, height, rect, tile_color(code));
        }
    }

    for entity in scene.entities.iter().filter(|entity| entity_visible(entity)) {
        let rect = mapping.rect(entity.x, entity.y, TILE);
        fill_rect_clipped(frame, width, height, rect, entity_color(entity.kind));
    }
}

fn fill_rect_clipped(frame: &mut [u8], width: u32, height: u32, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(width as i32);
    let bottom = rect.bottom.min(height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
