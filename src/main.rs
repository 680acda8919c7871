//! tilegfx-view: draws one image through the tiled pipeline
//!
//! Usage: `tilegfx-view <image> [config.ron]`
//!
//! Left/Right rotate, Up/Down scale, WASD move the anchor, H and V mirror,
//! R resets the transform, P saves the visible rectangle as PNG.

use std::path::PathBuf;

use macroquad::prelude::*;
use tilegfx::config::{load_config, PipelineConfig};
use tilegfx::decode::load_image_file;
use tilegfx::encode::{write_image_file, EncodeOptions};
use tilegfx::format::Color as PixelColor;
use tilegfx::geometry::draw_image;
use tilegfx::raster::{Framebuffer, RasterContext};
use tilegfx::texture::Image as SourceImage;
use tilegfx::VERSION;
use tracing_subscriber::EnvFilter;

const WIDTH: usize = 640;
const HEIGHT: usize = 480;
const BACKGROUND: PixelColor = PixelColor { r: 24, g: 24, b: 32, a: 255 };

fn window_conf() -> Conf {
    Conf {
        window_title: format!("tilegfx viewer v{}", VERSION),
        window_width: WIDTH as i32,
        window_height: HEIGHT as i32,
        window_resizable: true,
        ..Default::default()
    }
}

fn load_from_args() -> Result<(SourceImage, PipelineConfig), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().map(PathBuf::from).ok_or("usage: tilegfx-view <image> [config.ron]")?;
    let config = match args.next() {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    let image = load_image_file(&image_path, config.pixel_format, &config.decode_options())?;
    Ok((image, config))
}

/// Pivot on the image center, anchored at the middle of the screen
fn center(image: &mut SourceImage) {
    image.reset_transform();
    image.set_center(image.width() as f32 / 2.0, image.height() as f32 / 2.0);
    image.move_to(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (mut image, config) = match load_from_args() {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };
    let limit = config.tile_limit();
    center(&mut image);

    let mut ctx = RasterContext::new(Framebuffer::new(WIDTH, HEIGHT));

    loop {
        let dt = get_frame_time();
        let t = &mut image.transform;
        if is_key_down(KeyCode::Left) {
            t.angle -= 90.0 * dt;
        }
        if is_key_down(KeyCode::Right) {
            t.angle += 90.0 * dt;
        }
        if is_key_down(KeyCode::Up) {
            t.scale_x *= 1.0 + dt;
            t.scale_y *= 1.0 + dt;
        }
        if is_key_down(KeyCode::Down) {
            t.scale_x /= 1.0 + dt;
            t.scale_y /= 1.0 + dt;
        }
        let step = 200.0 * dt;
        if is_key_down(KeyCode::A) {
            t.x -= step;
        }
        if is_key_down(KeyCode::D) {
            t.x += step;
        }
        if is_key_down(KeyCode::W) {
            t.y -= step;
        }
        if is_key_down(KeyCode::S) {
            t.y += step;
        }
        if is_key_pressed(KeyCode::H) {
            image.mirror_horizontal();
        }
        if is_key_pressed(KeyCode::V) {
            image.mirror_vertical();
        }
        if is_key_pressed(KeyCode::R) {
            center(&mut image);
        }
        if is_key_pressed(KeyCode::P) {
            if let Err(e) = write_image_file(&image, "tilegfx-view.png", EncodeOptions::default()) {
                tracing::error!("failed to save: {}", e);
            }
        }

        ctx.backend_mut().clear(BACKGROUND);
        let quads = draw_image(&mut ctx, &image, limit);

        // Convert framebuffer to texture and draw to the window
        let fb = ctx.backend();
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        let t = &image.transform;
        draw_text(
            &format!(
                "{}x{} {:?} | {} quads | angle {:.0} | scale {:.2}",
                image.width(),
                image.height(),
                image.format(),
                quads,
                t.angle,
                t.scale_x
            ),
            10.0,
            20.0,
            20.0,
            WHITE,
        );

        next_frame().await;
    }
}
