use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::{Builder, Env};
use log::LevelFilter;
use rand::seq::SliceRandom;

use engine::{prelude::*, WorldSpec, BESTIARY};

pub const GAME_NAME: &str = "delve";

const DEMO_MAP: &str = include_str!("../demos/cave.txt");

/// Monsters don't start closer than this to the player.
const SPAWN_CLEARANCE: i32 = 6;

#[derive(Parser, Debug)]
#[command(name = GAME_NAME, about = "Run a headless dungeon simulation")]
struct Args {
    #[arg(long, help = "Game world seed")]
    seed: Option<u64>,

    #[arg(long, default_value_t = 200, help = "Number of player turns to run")]
    turns: usize,

    #[arg(long, help = "ASCII map file, built-in cave if not given")]
    map: Option<PathBuf>,

    #[arg(long, default_value_t = 8, help = "Number of monsters to spawn")]
    monsters: usize,

    #[arg(short, long, help = "Show debug logging")]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let _ = Builder::from_env(env).try_init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("seed: {seed}");

    let map = match &args.map {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Can't read map {}", path.display()))?,
        None => DEMO_MAP.to_string(),
    };

    let mut r = Runtime::new(&WorldSpec { seed, map })?;

    let Some(start) = r.random_free_pos() else {
        bail!("No room for the player on the map");
    };
    r.spawn_player(start);

    populate(&mut r, start, args.monsters);

    for turn in 0..args.turns {
        let Some(player) = r.live_player() else {
            log::info!("player died on turn {turn}");
            break;
        };

        let act = r.autopilot();
        if act == Action::Pass && player.hp(&r) < player.max_hp(&r) {
            r.rest(20);
        }
        if !r.player_turn(act) {
            // Bumped into something, wait instead.
            r.player_turn(Action::Pass);
        }
    }

    println!("{}", r.player_view());
    for line in r.messages(20) {
        println!("{line}");
    }
    log::info!("finished at tick {}", r.now().ticks());

    Ok(())
}

/// Scatter random monsters around the map.
fn populate(r: &mut Runtime, start: IVec2, n: usize) {
    for _ in 0..n {
        // Give up on a monster if there's no good spot for it.
        let pos = (0..100)
            .filter_map(|_| r.random_free_pos())
            .find(|p| (*p - start).chess_len() >= SPAWN_CLEARANCE);
        let Some(pos) = pos else {
            log::warn!("no room for more monsters");
            return;
        };

        let Some(spec) = BESTIARY.choose(r.rng()) else {
            return;
        };
        log::debug!("spawning {} at {pos}", spec.name);
        r.spawn_monster(spec.id, pos);
    }
}
