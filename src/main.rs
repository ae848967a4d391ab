mod render;

use std::path::Path;

use anyhow::{Context as _, Result, anyhow};
use piston_window::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use reef_swarm::fish::FishKind;
use reef_swarm::{SimConfig, Swarm};

const STATS_AREA_HEIGHT: f64 = 50.0;
const CONFIG_PATH: &str = "reef-swarm.json";
const FONT_PATH: &str = "assets/FiraSans-Regular.ttf";

fn load_config() -> Result<SimConfig> {
    let path = Path::new(CONFIG_PATH);
    if !path.exists() {
        info!("no {CONFIG_PATH} found, using default configuration");
        return Ok(SimConfig::default());
    }
    let config = SimConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = load_config()?;
    let mut swarm = Swarm::new(config).context("building the swarm")?;
    let world = swarm.config().world.clone();

    let mut window: PistonWindow = WindowSettings::new(
        "Reef Swarm",
        [world.width as u32, (world.height + STATS_AREA_HEIGHT) as u32],
    )
    .exit_on_esc(true)
    .build()
    .map_err(|err| anyhow!("failed to open window: {err}"))?;
    window.set_ups(world.fps.round().max(1.0) as u64);

    let mut glyphs = {
        let font_path = Path::new(FONT_PATH);
        if font_path.exists() {
            window.load_font(font_path).ok()
        } else {
            warn!(path = %font_path.display(), "font not found, stats bar text disabled");
            None
        }
    };

    info!(threads = rayon::current_num_threads(), "reef swarm running");
    let mut cursor = [0.0, 0.0];

    while let Some(e) = window.next() {
        if let Some(position) = e.mouse_cursor_args() {
            cursor = position;
        }

        match e.press_args() {
            Some(Button::Mouse(button)) => {
                let (x, y) = (cursor[0], cursor[1] - STATS_AREA_HEIGHT);
                let placed = match button {
                    MouseButton::Left => swarm.spawn_food_at(x, y),
                    MouseButton::Right => swarm.spawn_predator_at(x, y),
                    MouseButton::Middle => swarm.spawn_fish_at(FishKind::Small, x, y),
                    _ => true,
                };
                if !placed {
                    debug!(x, y, ?button, "spawn refused");
                }
            }
            Some(Button::Keyboard(Key::Space)) => swarm.reset(),
            Some(Button::Keyboard(Key::B)) => {
                let enabled = !swarm.balancer_enabled();
                swarm.set_balancer_enabled(enabled);
            }
            _ => {}
        }

        if let Some(args) = e.resize_args() {
            let [width, height] = args.window_size;
            if let Err(err) = swarm.resize(width, height - STATS_AREA_HEIGHT) {
                warn!(width, height, error = %err, "keeping the previous map size");
            }
        }

        if e.update_args().is_some() {
            swarm.step();
        }

        window.draw_2d(&e, |c, g, device| {
            clear(render::water_color(swarm.day_night()), g);

            rectangle(
                [0.15, 0.15, 0.2, 1.0],
                [0.0, 0.0, c.get_view_size()[0], STATS_AREA_HEIGHT],
                c.transform,
                g,
            );

            if let Some(ref mut glyphs) = glyphs {
                for (row, line) in render::stats_lines(&swarm).iter().enumerate() {
                    let drawn = text::Text::new_color([1.0, 1.0, 1.0, 1.0], 14).draw(
                        line,
                        glyphs,
                        &c.draw_state,
                        c.transform.trans(10.0, 20.0 + row as f64 * 20.0),
                        g,
                    );
                    if drawn.is_err() {
                        debug!("failed to draw stats text");
                    }
                }
                glyphs.factory.encoder.flush(device);
            }

            render::draw_world(&swarm, c.transform.trans(0.0, STATS_AREA_HEIGHT), g);
        });
    }

    Ok(())
}
