//! ob: CLI binary for the off-belief play harness.
//!
//! Subcommands:
//! - play

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use ob_actor::{
    ConsoleSource, HumanActor, PartnerLink, PlayerActor, PolicyActor, ACT_METHOD,
};
use ob_batch::{BatchModel, BatchRunner, SchedulerError, UniformModel};
use ob_core::{Config, ConfigError, GameEnv, MiniGame};
use ob_logging::{
    hash_config_bytes, now_ms, try_git_hash, write_manifest_atomic, BatchStatsEventV1,
    EpisodeEventV1, NdjsonError, NdjsonWriter, RunManifestV1, RUN_MANIFEST_VERSION,
};
use ob_runtime::{DriverError, EpisodeSummary, GameDriver, NdjsonStageObserver};

#[derive(Debug, Error)]
enum PlayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Log(#[from] NdjsonError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

struct PlayOpts {
    config_path: Option<String>,
    games: u64,
    seed: Option<u64>,
    off_belief: bool,
    human: bool,
    log_dir: Option<PathBuf>,
    json: bool,
}

fn cmd_play(args: &[String]) {
    let mut opts = PlayOpts {
        config_path: None,
        games: 1,
        seed: None,
        off_belief: false,
        human: false,
        log_dir: None,
        json: false,
    };

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ob play

USAGE:
    ob play [--config cfg.yaml] [--games N] [--seed S] [--off-belief] [--human] [--log-dir DIR] [--json]

OPTIONS:
    --config PATH    YAML configuration file (defaults apply when omitted)
    --games N        Number of episodes to play (default: 1)
    --seed S         Override the game and actor seeds
    --off-belief     Enable counterfactual evaluation for every policy seat
    --human          Put a console operator in seat 0
    --log-dir DIR    Write NDJSON events and a run manifest under DIR
    --json           Print a machine-readable summary instead of text
"#
                );
                return;
            }
            "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Missing value for --config");
                    process::exit(1);
                }
                opts.config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--games" => {
                if i + 1 >= args.len() {
                    eprintln!("Missing value for --games");
                    process::exit(1);
                }
                opts.games = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Invalid --games value: {}", args[i + 1]);
                    process::exit(1);
                });
                i += 2;
            }
            "--seed" => {
                if i + 1 >= args.len() {
                    eprintln!("Missing value for --seed");
                    process::exit(1);
                }
                let seed = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Invalid --seed value: {}", args[i + 1]);
                    process::exit(1);
                });
                opts.seed = Some(seed);
                i += 2;
            }
            "--off-belief" => {
                opts.off_belief = true;
                i += 1;
            }
            "--human" => {
                opts.human = true;
                i += 1;
            }
            "--log-dir" => {
                if i + 1 >= args.len() {
                    eprintln!("Missing value for --log-dir");
                    process::exit(1);
                }
                opts.log_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown option for `ob play`: {}", other);
                eprintln!("Run `ob play --help` for usage.");
                process::exit(1);
            }
        }
    }

    if let Err(e) = run_play(&opts) {
        eprintln!("play failed: {e}");
        process::exit(1);
    }
}

fn run_play(opts: &PlayOpts) -> Result<(), PlayError> {
    let mut config = match &opts.config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = opts.seed {
        config.game.seed = seed;
        config.actor.seed = seed;
    }
    if opts.off_belief {
        config.actor.off_belief = true;
    }

    let run_id = format!("play-{}", now_ms());
    let mut log = match &opts.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let writer = Arc::new(Mutex::new(NdjsonWriter::open_append_with_flush(
                dir.join("events.ndjson"),
                100,
            )?));
            let config_hash = serde_yaml::to_string(&config)
                .ok()
                .map(|s| hash_config_bytes(s.as_bytes()));
            let manifest = RunManifestV1 {
                run_manifest_version: RUN_MANIFEST_VERSION,
                run_id: run_id.clone(),
                created_ts_ms: now_ms(),
                git_hash: try_git_hash(),
                config_hash,
                logs_dir: dir.display().to_string(),
                games_requested: opts.games,
                off_belief: config.actor.off_belief,
                games_completed: 0,
                mean_score: None,
            };
            write_manifest_atomic(dir.join("run.json"), &manifest)?;
            Some((writer, manifest, dir.clone()))
        }
        None => None,
    };

    let model =
        Arc::new(UniformModel::new(config.model.hidden_dim)) as Arc<dyn BatchModel>;
    let runner = Arc::new(BatchRunner::new(model));
    runner.register_method(ACT_METHOD, config.scheduler.max_batch as usize)?;
    runner.start()?;

    let players = config.game.players;
    let links = PartnerLink::links_for(players as usize);
    let observer = log
        .as_ref()
        .map(|(writer, _, _)| NdjsonStageObserver::new(Arc::clone(writer), run_id.clone()));
    let mut actors = Vec::with_capacity(players as usize);
    for id in 0..players {
        if opts.human && id == 0 {
            actors.push(PlayerActor::Human(HumanActor::new(
                id,
                Box::new(ConsoleSource),
            )));
        } else {
            let mut policy =
                PolicyActor::new(id, Arc::clone(&runner), &config.actor, links.clone());
            if let Some(obs) = &observer {
                policy.set_observer(Box::new(obs.clone()));
            }
            actors.push(PlayerActor::Policy(policy));
        }
    }

    let mut env = MiniGame::new(&config.game);
    let mut driver = GameDriver::new(actors);
    let mut episodes: Vec<EpisodeSummary> = Vec::with_capacity(opts.games as usize);
    for game_id in 0..opts.games {
        if let Some(obs) = &observer {
            obs.set_game_id(game_id);
        }
        let summary = driver.play_episode(&mut env, game_id)?;
        if opts.human && !opts.json {
            println!("{}", env.describe(0));
        }
        if !opts.json {
            let fict = summary
                .fict_success_rate
                .map(|r| format!(", fict_ok={:.0}%", r * 100.0))
                .unwrap_or_default();
            println!(
                "game {}: score={:.1}, steps={}{}",
                summary.game_id, summary.score, summary.steps, fict
            );
        }
        if let Some((writer, _, _)) = &log {
            writer.lock().unwrap().write_event(&EpisodeEventV1 {
                event: "episode",
                ts_ms: now_ms(),
                run_id: run_id.clone(),
                game_id: summary.game_id,
                steps: summary.steps,
                score: summary.score,
                fict_success_rate: summary.fict_success_rate,
            })?;
        }
        episodes.push(summary);
    }

    let mean_score = if episodes.is_empty() {
        0.0
    } else {
        episodes.iter().map(|e| e.score as f64).sum::<f64>() / episodes.len() as f64
    };

    let stats = runner.stats_snapshot();
    if let Some((writer, manifest, dir)) = &mut log {
        {
            let mut w = writer.lock().unwrap();
            for (method, s) in &stats.methods {
                w.write_event(&BatchStatsEventV1 {
                    event: "batch_stats",
                    ts_ms: now_ms(),
                    run_id: run_id.clone(),
                    method: method.clone(),
                    calls: s.calls,
                    rows: s.rows,
                    failures: s.failures,
                    mean_rows: s.mean_rows(),
                })?;
            }
            w.flush()?;
        }
        manifest.games_completed = episodes.len() as u64;
        manifest.mean_score = Some(mean_score);
        write_manifest_atomic(dir.join("run.json"), manifest)?;
    }

    if opts.json {
        let summary = serde_json::json!({
            "run_id": run_id,
            "games": episodes.len(),
            "mean_score": mean_score,
            "off_belief": config.actor.off_belief,
            "episodes": episodes,
        });
        println!("{summary}");
    } else {
        println!();
        println!("Played {} game(s), mean score {:.2}", episodes.len(), mean_score);
        for (method, s) in &stats.methods {
            println!(
                "  method {}: {} invocation(s), {} row(s), mean batch {:.2}",
                method,
                s.calls,
                s.rows,
                s.mean_rows()
            );
        }
    }

    runner.stop();
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"ob - off-belief play harness CLI

USAGE:
    ob <COMMAND> [OPTIONS]

COMMANDS:
    play                Play batched-inference episodes of the built-in game

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `ob <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("ob {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(0);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "-V" | "--version" => {
            print_version();
        }
        "play" => {
            cmd_play(&args[2..]);
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Run `ob --help` for usage.");
            process::exit(1);
        }
    }
}
