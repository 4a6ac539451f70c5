//! # woundcare CLI Module
//!
//! This module implements the CLI interface for woundcare.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `register` - Register a wound
//! - `treat` - Record a treatment (re-evaluates the stage)
//! - `evaluate` - Re-run the stage rules on a wound
//! - `override` - Set a wound's stage by hand
//! - `show` - Show a wound and its treatments
//! - `list` - List wounds
//! - `summary` - Wound counts per stage
//! - `delete` - Delete a wound and its treatments

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use woundcare_core::WoundcareError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// woundcare - wound registry with clinical-stage auto-evaluation
///
/// Records wounds and their treatments ("curaciones") and keeps each
/// wound's clinical stage up to date after every treatment.
#[derive(Parser, Debug)]
#[command(name = "woundcare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the wound database
    #[arg(short = 'D', long, global = true, default_value = "woundcare.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Path to the TOML configuration file (optional)
    #[arg(short = 'C', long, global = true, default_value = "woundcare.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (default: config file, then 127.0.0.1)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default: config file, then 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Register a wound
    Register(RegisterArgs),

    /// Record a treatment and re-evaluate the wound's stage
    Treat {
        /// Wound ID
        wound: u64,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Clinician who performed the treatment
        #[arg(long)]
        performed_by: Option<String>,
    },

    /// Re-run the stage rules on a wound
    Evaluate {
        /// Wound ID
        wound: u64,
    },

    /// Set a wound's stage by hand, bypassing the rules
    Override {
        /// Wound ID
        wound: u64,

        /// Stage (valoracion_inicial, tratamiento_en_curso, bajo_observacion,
        /// evolucion_favorable, alta_clinica)
        stage: String,
    },

    /// Show a wound and its treatments
    Show {
        /// Wound ID
        wound: u64,
    },

    /// List wounds
    List {
        /// Only wounds of this patient
        #[arg(short, long)]
        patient: Option<u64>,
    },

    /// Wound counts per clinical stage
    Summary,

    /// Delete a wound and all of its treatments
    Delete {
        /// Wound ID
        wound: u64,
    },
}

/// Arguments of `register`. Values are parsed like the HTTP payload.
#[derive(clap::Args, Debug, Default)]
pub struct RegisterArgs {
    /// Patient ID
    #[arg(long)]
    pub patient: u64,

    /// Infection signs ("si" / "no")
    #[arg(long)]
    pub infection: Option<String>,

    /// Pain on the 0-10 scale
    #[arg(long)]
    pub pain: Option<String>,

    /// Exudate amount (escaso, moderado, abundante)
    #[arg(long)]
    pub exudate: Option<String>,

    /// Length in cm
    #[arg(long)]
    pub length: Option<String>,

    /// Width in cm
    #[arg(long)]
    pub width: Option<String>,

    /// Anatomical location
    #[arg(long)]
    pub location: Option<String>,

    /// Wound type
    #[arg(long)]
    pub wound_type: Option<String>,

    /// Free-text description
    #[arg(long)]
    pub description: Option<String>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WoundcareError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        config: cli.config,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, host, port).await,
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Register(args)) => cmd_register(&ctx, &args),
        Some(Commands::Treat {
            wound,
            notes,
            performed_by,
        }) => cmd_treat(&ctx, wound, notes, performed_by),
        Some(Commands::Evaluate { wound }) => cmd_evaluate(&ctx, wound),
        Some(Commands::Override { wound, stage }) => cmd_override(&ctx, wound, &stage),
        Some(Commands::Show { wound }) => cmd_show(&ctx, wound),
        Some(Commands::List { patient }) => cmd_list(&ctx, patient),
        Some(Commands::Delete { wound }) => cmd_delete(&ctx, wound),
        // No subcommand - show the summary by default
        Some(Commands::Summary) | None => cmd_summary(&ctx),
    }
}
