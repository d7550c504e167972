use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ceres::config::BuildConfig;
use ceres::decl::Program;
use ceres::diagnostics::CompileError;

#[derive(Parser)]
#[command(name = "ceresc", version, about = "The Ceres backend driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a declaration file and emit a relocatable object
    Build {
        /// Declaration file (JSON) produced by the front-end
        file: PathBuf,
        /// Output object path
        #[arg(short, long, default_value = "out.o")]
        output: PathBuf,
        /// Build configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a declaration file without writing anything
    Check {
        /// Declaration file (JSON) produced by the front-end
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CompileError> {
    match cli.command {
        Commands::Build { file, output, config } => {
            let program = load_program(&file)?;
            let config = match config {
                Some(path) => BuildConfig::load(&path)?,
                None => BuildConfig::default(),
            };
            let bytes = ceres::emit_object(&program, &config)?;
            std::fs::write(&output, &bytes)
                .map_err(|e| CompileError::codegen(format!("failed to write object file: {e}")))?;
            Ok(())
        }
        Commands::Check { file } => {
            let program = load_program(&file)?;
            ceres::check(&program)
        }
    }
}

fn load_program(path: &Path) -> Result<Program, CompileError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CompileError::config(format!("failed to read declarations: {e}"), path.to_path_buf())
    })?;
    serde_json::from_str(&text).map_err(|e| {
        CompileError::config(format!("invalid declarations: {e}"), path.to_path_buf())
    })
}
