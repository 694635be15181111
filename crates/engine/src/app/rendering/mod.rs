mod renderer;

pub use renderer::{draw_frame, tile_color, Renderer};
