//! Human-input driver for a Stagehand scene.
//!
//! Launches (or attaches to) an engine session, starts the scene described by
//! a config file, then reads commands interactively from standard input:
//!
//! - `MoveAhead` -- a bare action
//! - `RotateLook, rotation=45, horizon=15` -- action with parameters
//! - a single letter -- the action's shortcut key
//! - `help` / `exit`

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stagehand::action::Action;
use stagehand::config::load_scene_file;
use stagehand::controller::{Controller, ControllerOptions, ThorController};
use stagehand::engine::{AnyEngine, ThorHttpEngine};
use stagehand::params::{NoiseModel, ParamMap};

/// Drive a simulator scene from the keyboard.
#[derive(Parser)]
#[command(name = "stagehand", version, about)]
struct Cli {
    /// Path to the engine executable.
    engine: PathBuf,

    /// Path to the scene configuration JSON file.
    scene: PathBuf,

    /// Port for the launched engine session.
    #[arg(long, default_value_t = 8890)]
    port: u16,

    /// Attach to an already-running engine session at this URL instead of
    /// launching the executable.
    #[arg(long)]
    url: Option<String>,

    /// Write per-step debug artifacts and echo step details.
    #[arg(long)]
    debug: bool,

    /// Apply jitter to rotation, horizon, and move magnitude.
    #[arg(long)]
    noise: bool,

    /// Fixed seed for the noise rng.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = load_scene_file(&cli.scene)?;

    let engine = match &cli.url {
        Some(url) => ThorHttpEngine::connect(url)?,
        None => ThorHttpEngine::launch(&cli.engine, cli.port)?,
    };

    let options = ControllerOptions {
        debug_to_file: cli.debug,
        debug_to_terminal: cli.debug,
        noise: if cli.noise {
            NoiseModel::uniform()
        } else {
            NoiseModel::Disabled
        },
        noise_seed: cli.seed,
        ..ControllerOptions::default()
    };

    let mut controller = ThorController::new(AnyEngine::Thor(engine), options);

    let output = controller
        .start_scene(config)
        .context("failed to start the scene")?;
    println!("step={}", output.step_number);

    print_commands();
    input_loop(&mut controller)?;

    controller.end_scene("", 0.0)?;
    Ok(())
}

/// Display all the possible commands along with their key mappings.
fn print_commands() {
    println!("--------------- Available Commands ---------------");
    for action in Action::ALL {
        println!("*******************");
        println!("Command: {action}");
        println!("Usage: {}", action.usage());
        println!("ShortcutKey: {}", action.shortcut_key());
    }
    println!("*******************");
    println!("Example commands:");
    println!("MoveAhead");
    println!("RotateLook, rotation=45, horizon=15");
    println!();
    println!("Enter 'help' to print the commands again.");
    println!("Enter 'exit' to exit the program.");
    println!("------------------ End Commands ------------------");
}

/// Execute input commands until the user exits.
fn input_loop(controller: &mut ThorController) -> Result<()> {
    let stdin = std::io::stdin();
    println!("Enter your command:");

    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        let input = line.trim();

        match input {
            "" => {}
            "exit" => {
                println!("Exiting Human Input Mode");
                return Ok(());
            }
            "help" => print_commands(),
            _ => run_command(controller, input)?,
        }

        println!("Enter your command:");
    }

    Ok(())
}

fn run_command(controller: &mut ThorController, input: &str) -> Result<()> {
    // A single character is a shortcut key.
    let command = if input.chars().count() == 1 {
        let key = input.chars().next().unwrap();
        match Action::from_shortcut(key) {
            Some(action) => action.as_str().to_string(),
            None => {
                println!(
                    "You entered an invalid shortcut key, please try again. \
                     (Type 'help' to display commands again)"
                );
                println!("You entered: {input}");
                return Ok(());
            }
        }
    } else {
        input.to_string()
    };

    println!("You entered command:");
    println!("{command}");

    match controller.step(&command, ParamMap::new())? {
        Some(output) => println!("step={}", output.step_number),
        None => println!("The scene is out of steps; enter 'exit' to finish."),
    }
    Ok(())
}
