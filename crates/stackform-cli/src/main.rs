use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stackform",
    about = "Stackform — declarative VPC, search cluster, and replicated table topologies",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a scaffold stackform.toml
    Init {
        /// Target directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Stack name written into [stack].name
        #[arg(short, long, default_value = "opensearch")]
        name: String,
    },
    /// Parse and validate a topology configuration
    Validate {
        #[arg(short, long, default_value = "stackform.toml")]
        config: String,
    },
    /// Synthesize the resource graph and emit the manifest.
    ///
    /// `json` writes the full manifest (to --out if given, otherwise stdout).
    /// `summary` prints per-kind declaration counts and the fingerprint.
    Synth {
        #[arg(short, long, default_value = "stackform.toml")]
        config: String,
        #[arg(short, long)]
        out: Option<String>,
        /// Output format: json or summary
        #[arg(short, long, default_value = "json")]
        format: String,
    },
    /// Print the realization waves in order
    Plan {
        #[arg(short, long, default_value = "stackform.toml")]
        config: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stackform=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path, name } => commands::config::init(&path, &name),
        Commands::Validate { config } => commands::config::validate(&config),
        Commands::Synth { config, out, format } => {
            commands::synth::synth(&config, out.as_deref(), &format)
        }
        Commands::Plan { config } => commands::synth::plan(&config),
    }
}
