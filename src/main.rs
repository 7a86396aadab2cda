//! Platformer Core entry point
//!
//! Headless runner: plays a built-in level with a scripted input track and
//! logs what happens. Set `RUST_LOG=debug` to see mode changes and hits.
//!
//! Usage: `platformer-core [settings.json] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;

    use platformer_core::sim::{Buttons, GamePhase, SpriteType, TickInput, World, tick};
    use platformer_core::{Level, SimSettings, Tuning};

    /// Frames to simulate (20 seconds at 60 Hz)
    const RUN_FRAMES: u32 = 1200;
    const RNG_SEED: u64 = 0x5EED;

    const DEMO_LEVEL: [&str; 11] = [
        "################################",
        "#..............................#",
        "#..........BBBB.............1..#",
        "#..............................#",
        "#.....=====.........####...#####",
        "#1..........................M..#",
        "#..P......M.......S............#",
        "#########...#########...H......#",
        "#~~~~~~~#...#.......#..........#",
        "#~~~~~~~#^^^#.......#XXXXXXXXXX#",
        "################################",
    ];

    /// Walk, jump, dash and try the door, on a four second loop
    fn scripted_buttons(frame: u32) -> Buttons {
        match frame % 240 {
            0..60 => Buttons::RIGHT,
            60..100 => Buttons::RIGHT | Buttons::JUMP,
            100..104 => Buttons::RUN | Buttons::RIGHT,
            104..120 => Buttons::RUN,
            140..200 => Buttons::LEFT,
            200..215 => Buttons::UP,
            _ => Buttons::empty(),
        }
    }

    pub fn run() {
        let args: Vec<String> = std::env::args().collect();
        let settings = args
            .get(1)
            .map(|p| SimSettings::load(Path::new(p)))
            .unwrap_or_default();
        let tuning = args
            .get(2)
            .map(|p| Tuning::load(Path::new(p)))
            .unwrap_or_default();

        let mut world = World::from_level(Level::from_ascii(&DEMO_LEVEL), tuning, settings, RNG_SEED);
        log::info!("Level loaded with {} actors", world.sprite_count());

        for i in 0..RUN_FRAMES {
            match world.phase {
                GamePhase::GameOver => break,
                GamePhase::ReloadRequested { level_index } => {
                    log::info!("Reloading level {}", level_index);
                    world.reload(Level::from_ascii(&DEMO_LEVEL));
                }
                GamePhase::Playing | GamePhase::Respawning { .. } => {}
            }

            tick(&mut world, &TickInput { player: scripted_buttons(i) });

            if i % 60 == 0
                && let Some(p) = world.player_sprite()
            {
                log::info!(
                    "Frame {}: player at {} mode {} health {}",
                    world.frame,
                    p.world_pos(),
                    p.move_mode(),
                    p.health
                );
            }
        }

        println!("Simulated {} frames", world.frame);
        println!("Phase: {:?}, lives left: {}", world.phase, world.lives);
        for stype in SpriteType::ALL {
            let count = world.count_of(stype);
            if count > 0 {
                println!("  {:?}: {}", stype, count);
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Platformer Core (headless) starting...");
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The engine is embedded by a host on wasm; there is no runner
}
