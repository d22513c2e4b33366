//! sightline-replay: run a visibility scenario headless and report each tick.
//!
//! Usage:
//!   sightline-replay run --scenario demo.json --ticks 30 --json
//!   sightline-replay sample > demo.json

mod scenario;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use hecs::Entity;
use sightline_core::config::{load_visibility_config_from_env, VisibilityConfig};
use sightline_core::events::VisibilityEvent;
use sightline_core::player::AllianceTable;
use sightline_core::state::VisibilitySnapshot;
use sightline_sim::{SimConfig, VisibilityEngine};
use tracing_subscriber::EnvFilter;

use crate::scenario::{Scenario, SAMPLE_SCENARIO};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "sample" => println!("{SAMPLE_SCENARIO}"),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "sightline-replay: headless fog-of-war scenario runner\n\
         \n\
         Commands:\n\
         \n\
         run       Run a scenario and print one line per tick\n\
         \n\
           --scenario <path>  Scenario JSON file\n\
           --ticks <N>        Override the scenario's tick count\n\
           --config <path>    Visibility config JSON (default: $SIGHTLINE_VISIBILITY_CONFIG or builtin)\n\
           --json             Print full snapshots as JSON lines instead\n\
         \n\
         sample    Print a demo scenario to stdout\n\
         \n\
         Examples:\n\
         \n\
           sightline-replay sample > demo.json\n\
           RUST_LOG=sightline=debug sightline-replay run --scenario demo.json --ticks 30\n"
    );
}

fn parse_path(args: &[String], flag: &str) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}

fn parse_ticks(args: &[String]) -> Option<u64> {
    for i in 0..args.len() {
        if args[i] == "--ticks" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn load_config(args: &[String]) -> Arc<VisibilityConfig> {
    let Some(path) = parse_path(args, "--config") else {
        return load_visibility_config_from_env();
    };
    match VisibilityConfig::from_file(&path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Error loading visibility config: {e}");
            process::exit(1);
        }
    }
}

fn cmd_run(args: &[String]) {
    let scenario_path = match parse_path(args, "--scenario") {
        Some(p) => p,
        None => {
            eprintln!("Error: --scenario <path> is required");
            process::exit(1);
        }
    };
    let json = args.iter().any(|a| a == "--json");

    let scenario = match Scenario::from_file(&scenario_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let grid = match scenario.build_grid() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut alliances = AllianceTable::new(scenario.shared_vision);
    for &(a, b) in &scenario.alliances {
        alliances.ally(a, b);
    }
    let config = SimConfig {
        visibility: load_config(args),
        alliances,
    };

    let mut engine = VisibilityEngine::new(grid, config);
    let objects: Vec<Entity> = scenario
        .objects
        .iter()
        .map(|spec| engine.spawn(spec.clone()))
        .collect();
    for spec in &scenario.spotters {
        engine.add_spotter(*spec);
    }

    let ticks = parse_ticks(args).unwrap_or(scenario.ticks);
    tracing::info!(
        target: "sightline::replay",
        path = %scenario_path.display(),
        ticks,
        objects = objects.len(),
        spotters = scenario.spotters.len(),
        "replay.started"
    );
    eprintln!(
        "Running {} for {ticks} tick(s): {}x{} tiles, {} object(s), {} spotter(s)",
        scenario_path.display(),
        scenario.width,
        scenario.height,
        objects.len(),
        scenario.spotters.len(),
    );

    for tick in 0..ticks {
        for m in scenario.moves_at(tick) {
            if engine.move_object(objects[m.object], m.to) {
                tracing::debug!(
                    target: "sightline::replay",
                    tick,
                    object = m.object,
                    x = m.to.x,
                    y = m.to.y,
                    "replay.move"
                );
            } else {
                tracing::warn!(
                    target: "sightline::replay",
                    tick,
                    object = m.object,
                    "replay.move_skipped"
                );
            }
        }
        let snapshot = engine.tick();
        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    eprintln!("Error serializing snapshot: {e}");
                    process::exit(1);
                }
            }
        } else {
            println!("{}", summarize(&snapshot));
        }
    }
    tracing::info!(
        target: "sightline::replay",
        tick = engine.time().tick,
        spotters = engine.spotters().len(),
        "replay.finished"
    );
}

/// One-line human summary of a snapshot.
fn summarize(snapshot: &VisibilitySnapshot) -> String {
    let mut line = format!("tick {:>4}", snapshot.time.tick);
    for view in &snapshot.players {
        line.push_str(&format!(
            "  p{}: {}/{} tiles",
            view.player.0, view.visible_tiles, view.explored_tiles
        ));
    }
    line.push_str(&format!("  spotters: {}", snapshot.spotters));
    for event in &snapshot.events {
        match event {
            VisibilityEvent::FirstSighting { object, player } => {
                line.push_str(&format!("  [p{} sighted #{object:x}]", player.0));
            }
            VisibilityEvent::SpotterExpired { spotter, player } => {
                line.push_str(&format!("  [p{} spotter {spotter} expired]", player.0));
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_core::player::PlayerId;
    use sightline_core::state::PlayerView;
    use sightline_core::types::SimTime;

    #[test]
    fn summary_lists_players_and_events() {
        let snapshot = VisibilitySnapshot {
            time: SimTime { tick: 7 },
            players: vec![PlayerView {
                player: PlayerId(0),
                explored_tiles: 40,
                visible_tiles: 13,
            }],
            spotters: 1,
            events: vec![VisibilityEvent::SpotterExpired {
                spotter: 3,
                player: PlayerId(0),
            }],
            ..Default::default()
        };
        let line = summarize(&snapshot);
        assert!(line.starts_with("tick    7"));
        assert!(line.contains("p0: 13/40 tiles"));
        assert!(line.contains("[p0 spotter 3 expired]"));
    }

    #[test]
    fn flag_parsing() {
        let args: Vec<String> = ["--scenario", "a.json", "--ticks", "12"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_path(&args, "--scenario"), Some(PathBuf::from("a.json")));
        assert_eq!(parse_ticks(&args), Some(12));
        assert_eq!(parse_path(&args, "--config"), None);
    }
}
