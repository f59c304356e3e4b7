use std::{fs, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use log::{debug, info};

use digiboard::{
    circuit_sim::CircuitSim,
    modules::{ModuleRecord, ModuleRegistry},
    pieces::PieceKind,
    Circuit,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "digiboard")]
#[command(about = "Logic circuit simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Module library file
    #[arg(short, long, global = true, default_value = "modules.json")]
    modules: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a circuit for a number of frames and print its outputs
    Run {
        #[arg(value_name = "CIRCUIT")]
        circuit: PathBuf,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "60")]
        frames: u64,

        /// Time between frames in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
    },

    /// Collapse a circuit into a single gate and save it as a module
    Combine {
        #[arg(value_name = "CIRCUIT")]
        circuit: PathBuf,

        /// Module name
        #[arg(short, long)]
        name: String,

        /// Embed the live circuit instead of a truth table
        #[arg(short, long)]
        encapsulate: bool,

        /// Where to write the combined circuit
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// List, import or delete modules
    Modules {
        /// Module file whose new entries are added to the library
        #[arg(long, value_name = "FILE")]
        import: Option<PathBuf>,

        /// Module to delete
        #[arg(long, value_name = "NAME")]
        delete: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut registry = ModuleRegistry::load(&cli.modules)?;

    match cli.command {
        Commands::Run {
            circuit,
            frames,
            frame_ms,
        } => {
            let mut circuit = Circuit::from_json(&fs::read_to_string(circuit)?, &registry)?;
            run(&mut circuit, frames, Duration::from_millis(frame_ms));
            print_outputs(&circuit);
        }

        Commands::Combine {
            circuit: path,
            name,
            encapsulate,
            output,
        } => {
            let mut circuit = Circuit::from_json(&fs::read_to_string(&path)?, &registry)?;
            if encapsulate {
                circuit.encapsulate(Some(name.as_str()), &mut registry);
            } else {
                circuit.combine(Some(name.as_str()), &mut registry)?;
            }
            registry.flush()?;
            if let Some(output) = output {
                fs::write(output, circuit.to_json()?)?;
            }
        }

        Commands::Modules { import, delete } => {
            let mut changed = false;
            if let Some(import) = import {
                let other = ModuleRegistry::from_json(&fs::read_to_string(import)?)?;
                changed |= registry.import(other.list().to_vec()) > 0;
            }
            if let Some(name) = delete {
                match registry.delete(&name) {
                    Some(_) => changed = true,
                    None => println!("No module named `{name}`"),
                }
            }
            if changed {
                registry.flush()?;
            }
            for record in registry.list() {
                let kind = match record {
                    ModuleRecord::Table { .. } => "table",
                    ModuleRecord::Composite { .. } => "composite",
                };
                println!(
                    "{:<20} {kind:<9} {} in, {} out",
                    record.name(),
                    record.num_inputs(),
                    record.num_outputs()
                );
            }
        }
    }
    Ok(())
}

/// Advances every clock by one frame and propagates, `frames` times.
fn run(circuit: &mut Circuit, frames: u64, frame: Duration) {
    let mut unsettled = 0;
    for i in 0..=frames {
        let now = frame * i as u32;
        circuit.advance_clocks(now);
        let result = circuit.simulate();
        if !result.converged() {
            unsettled += 1;
        }
        debug!("Frame {i} at {now:?}: {result:?}");
    }
    info!("Ran {frames} frame(s), {unsettled} did not settle");
}

fn print_outputs(circuit: &Circuit) {
    for (piece_id, piece) in circuit.pieces() {
        match piece.kind() {
            PieceKind::Light(light) => println!("{piece_id} LIGHT {}", light.state()),
            PieceKind::Digit(display) => println!("{piece_id} DIGIT {}", display.digit()),
            _ => (),
        }
    }
}
