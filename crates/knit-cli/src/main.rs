mod config;
mod generate_cmd;
#[cfg(test)]
mod test_util;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use config::{CliOverrides, KnitConfig};

#[derive(Parser)]
#[command(name = "knit", about = "Turn a one-line project description into a generated source tree")]
struct Cli {
    /// Also write logs to this file (appended, no colors)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a knit config file
    Init {
        /// API key for the provider (otherwise read from GROQ_API_KEY at run time)
        #[arg(long)]
        api_key: Option<String>,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
        /// OpenAI-compatible base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Plan, generate and write a project from a description
    Generate {
        /// Natural-language description of the project
        prompt: String,
        /// Directory the project is written to
        #[arg(short, long, default_value = "generated_app")]
        output: PathBuf,
        #[command(flatten)]
        provider: ProviderArgs,
        /// Override the sampling temperature
        #[arg(long)]
        temperature: Option<f32>,
        /// Only plan: print the plan and file list, write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the architect's plan for a description as JSON
    Plan {
        /// Natural-language description of the project
        prompt: String,
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Provider overrides shared by the commands that call the service.
#[derive(Args, Debug)]
struct ProviderArgs {
    /// Override the API key (GROQ_API_KEY, config file)
    #[arg(long)]
    api_key: Option<String>,
    /// Override the OpenAI-compatible base URL (KNIT_BASE_URL, config file)
    #[arg(long)]
    base_url: Option<String>,
    /// Override the model (KNIT_MODEL, config file)
    #[arg(long)]
    model: Option<String>,
}

impl ProviderArgs {
    fn into_overrides(self, temperature: Option<f32>) -> CliOverrides {
        CliOverrides {
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            temperature,
        }
    }
}

/// Execute the `knit init` command: write config file.
fn cmd_init(
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    if let Some(model) = model {
        cfg.provider.model = model;
    }
    if let Some(base_url) = base_url {
        cfg.provider.base_url = base_url;
    }
    cfg.provider.api_key = api_key;

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  provider.base_url = {}", cfg.provider.base_url);
    println!("  provider.model = {}", cfg.provider.model);
    match &cfg.provider.api_key {
        Some(key) => println!("  provider.api_key = {}", config::mask_key(key)),
        None => {
            println!("  provider.api_key = (not set)");
            println!();
            println!("Set {} or rerun with --api-key before generating.", config::API_KEY_ENV);
        }
    }

    Ok(())
}

/// Install the console subscriber, plus a file layer when `log_file` is set.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    // Logs go to stderr so `knit plan` output stays pipeable.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init {
            api_key,
            model,
            base_url,
            force,
        } => {
            cmd_init(api_key, model, base_url, force)?;
        }
        Commands::Generate {
            prompt,
            output,
            provider,
            temperature,
            dry_run,
        } => {
            let resolved = KnitConfig::resolve(&provider.into_overrides(temperature))?;
            debug!(
                model = %resolved.provider.model,
                base_url = %resolved.provider.base_url,
                output_dir = %output.display(),
                "resolved provider"
            );
            let orchestrator = generate_cmd::build_orchestrator(resolved.provider)?;
            let summary = generate_cmd::run_generate(&orchestrator, &prompt, &output, dry_run).await?;
            println!("{summary}");
        }
        Commands::Plan { prompt, provider } => {
            let resolved = KnitConfig::resolve(&provider.into_overrides(None))?;
            let orchestrator = generate_cmd::build_orchestrator(resolved.provider)?;
            let json = generate_cmd::run_plan(&orchestrator, &prompt).await?;
            println!("{json}");
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "knit", &mut std::io::stdout());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults_output_directory() {
        let cli = Cli::try_parse_from(["knit", "generate", "a todo app"]).unwrap();
        match cli.command {
            Commands::Generate {
                prompt,
                output,
                dry_run,
                provider,
                temperature,
            } => {
                assert_eq!(prompt, "a todo app");
                assert_eq!(output, PathBuf::from("generated_app"));
                assert!(!dry_run);
                assert!(provider.model.is_none());
                assert!(provider.api_key.is_none());
                assert!(temperature.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn global_log_file_after_subcommand() {
        let cli = Cli::try_parse_from([
            "knit", "generate", "x", "--dry-run", "-o", "out", "--log-file", "app.log",
        ])
        .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("app.log")));
        assert!(matches!(cli.command, Commands::Generate { dry_run: true, .. }));
    }

    #[test]
    fn completions_accepts_known_shells() {
        let cli = Cli::try_parse_from(["knit", "completions", "zsh"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Zsh }));
        assert!(Cli::try_parse_from(["knit", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn provider_flags_reach_overrides() {
        let cli = Cli::try_parse_from([
            "knit",
            "plan",
            "a todo app",
            "--api-key",
            "cli-key",
            "--base-url",
            "http://localhost:8080/v1",
            "--model",
            "llama-3.1-8b-instant",
        ])
        .unwrap();
        let Commands::Plan { provider, .. } = cli.command else {
            panic!("expected plan");
        };

        let overrides = provider.into_overrides(None);
        assert_eq!(overrides.api_key.as_deref(), Some("cli-key"));
        assert_eq!(overrides.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(overrides.model.as_deref(), Some("llama-3.1-8b-instant"));
        assert!(overrides.temperature.is_none());
    }

    #[test]
    fn cli_api_key_and_base_url_win_over_env() {
        let _lock = crate::test_util::lock_env();
        unsafe { std::env::set_var(config::API_KEY_ENV, "env-key") };
        unsafe { std::env::set_var(config::BASE_URL_ENV, "https://env.example/v1") };

        let cli = Cli::try_parse_from([
            "knit",
            "generate",
            "x",
            "--api-key",
            "cli-key",
            "--base-url",
            "http://localhost:9/v1",
            "--temperature",
            "0.1",
        ])
        .unwrap();
        let Commands::Generate {
            provider,
            temperature,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        let resolved = KnitConfig::resolve_with(None, &provider.into_overrides(temperature));

        unsafe { std::env::remove_var(config::API_KEY_ENV) };
        unsafe { std::env::remove_var(config::BASE_URL_ENV) };

        let provider = resolved.unwrap().provider;
        assert_eq!(provider.api_key, "cli-key");
        assert_eq!(provider.base_url, "http://localhost:9/v1");
        assert_eq!(provider.temperature, 0.1);
    }
}
