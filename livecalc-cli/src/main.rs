mod commands;
mod exit_code;
mod runners;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::export_csv::ExportCsvArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "livecalc", about = "Run and debug LiveCalc DAG pipelines")]
struct Cli {
    /// Emit logs as newline-delimited JSON instead of human-readable text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a pipeline configuration without executing it.
    Validate {
        /// Path to the pipeline configuration JSON document.
        config: PathBuf,
    },
    /// Execute one pipeline run.
    Run {
        /// Path to the pipeline configuration JSON document.
        config: PathBuf,
        /// Optional TOML file with host daemon settings.
        #[arg(long)]
        daemon_settings: Option<PathBuf>,
        /// Directory holding compiled `.wasm`/`.lua` engine modules.
        #[arg(long, default_value = "modules")]
        modules_dir: PathBuf,
        /// Directory for the breakpoint controller's sled database.
        #[arg(long, default_value = "breakpoints.db")]
        breakpoint_db: PathBuf,
        /// Directory where run snapshots' metadata sidecars are written.
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,
        /// File supplying the reserved `$policies` host input.
        #[arg(long)]
        policies: Option<PathBuf>,
        /// File supplying the reserved `$assumptions` host input.
        #[arg(long)]
        assumptions: Option<PathBuf>,
        /// File supplying the reserved `$scenarios` host input.
        #[arg(long)]
        scenarios: Option<PathBuf>,
        /// Open an interactive console for pause/resume/step/abort/snapshot
        /// while the run executes in the background.
        #[arg(long)]
        interactive: bool,
    },
    /// Export a persisted run snapshot's bus resources to CSV.
    ExportCsv {
        /// The run id printed/used during `run`.
        run_id: String,
        /// Where to write the CSV file.
        output: PathBuf,
        /// Directory for the breakpoint controller's sled database.
        #[arg(long, default_value = "breakpoints.db")]
        breakpoint_db: PathBuf,
        /// Directory holding run snapshots' metadata sidecars.
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,
        /// Only export these resources (repeatable); default is all of them.
        #[arg(long = "resource")]
        resources: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if cli.json_logs {
        livecalc_otel::init_json_logging();
    } else {
        livecalc_otel::init_logging();
    }

    let code = match cli.command {
        Command::Validate { config } => commands::validate::run(&config),
        Command::Run {
            config,
            daemon_settings,
            modules_dir,
            breakpoint_db,
            snapshot_dir,
            policies,
            assumptions,
            scenarios,
            interactive,
        } => commands::run::run(RunArgs {
            config_path: &config,
            daemon_settings_path: daemon_settings.as_deref(),
            modules_dir: &modules_dir,
            breakpoint_db_path: &breakpoint_db,
            snapshot_dir: &snapshot_dir,
            policies_path: policies.as_deref(),
            assumptions_path: assumptions.as_deref(),
            scenarios_path: scenarios.as_deref(),
            interactive,
        }),
        Command::ExportCsv { run_id, output, breakpoint_db, snapshot_dir, resources } => {
            commands::export_csv::run(ExportCsvArgs {
                run_id: &run_id,
                breakpoint_db_path: &breakpoint_db,
                snapshot_dir: &snapshot_dir,
                output_path: &output,
                resources,
            })
        }
    };

    std::process::exit(code);
}
