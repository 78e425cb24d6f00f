//! magiskfrida - MagiskFrida installer archive builder

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use magiskfrida_cli::cmd::{self, UpstreamOverrides, build::BuildOptions};
use magiskfrida_cli::ui::Output;
use magiskfrida_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(cli.quiet);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Build {
            platforms,
            release,
            keep_going,
            release_url,
            download_url,
        } => {
            let overrides = UpstreamOverrides {
                release_url,
                download_url,
            };
            let config = cmd::load_config(&cli.base_dir, config_path, &overrides)?;
            let options = BuildOptions {
                platforms,
                release,
                keep_going,
                dry_run: cli.dry_run,
            };
            cmd::build::build(config, cmd::http_client()?, options, &output).await
        }
        Commands::Resolve { release_url } => {
            let overrides = UpstreamOverrides {
                release_url,
                download_url: None,
            };
            let config = cmd::load_config(&cli.base_dir, config_path, &overrides)?;
            cmd::resolve::resolve(&config, cmd::http_client()?).await
        }
        Commands::Clean { downloads } => {
            let config =
                cmd::load_config(&cli.base_dir, config_path, &UpstreamOverrides::default())?;
            cmd::clean::clean(&config, downloads, cli.dry_run, &output)
        }
        Commands::Platforms => {
            let config =
                cmd::load_config(&cli.base_dir, config_path, &UpstreamOverrides::default())?;
            cmd::platforms::platforms(&config, &output)
        }
    }
}
