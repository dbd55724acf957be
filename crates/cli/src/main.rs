mod run;
mod shutdown;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    curfew_config::Settings,
    curfew_cron::{
        Alignment, first_tick_ms,
        schedule::{format_ms, now_ms},
    },
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "curfew", about = "Curfew: scheduled channel visibility for Discord", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides the config's
    /// `debug` flag; `RUST_LOG` overrides both.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching `./` and `~/.config/curfew/`.
    #[arg(long, global = true, env = "CURFEW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Connect to Discord and flip managed channels (default).
    Run,
    /// Validate configuration and print when the first flip would happen.
    Check,
}

/// Directive used when `RUST_LOG` is unset.
fn default_directive(log_level: Option<&str>, debug: bool) -> String {
    match log_level {
        Some(level) => level.to_string(),
        None if debug => "debug".into(),
        None => "info".into(),
    }
}

fn init_telemetry(cli: &Cli, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(cli.log_level.as_deref(), debug)));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn check(settings: &Settings) {
    let interval = settings.flip_interval;
    let first = first_tick_ms(now_ms(), interval);
    println!("configuration ok");
    println!("  flip interval: {}s", interval.as_secs_f64());
    println!("  alignment:     {:?}", Alignment::for_interval(interval));
    println!("  first flip:    {}", format_ms(first));
    println!(
        "  metrics:       {}",
        if settings.metrics.enabled {
            format!("prometheus on {}", settings.metrics.listen)
        } else {
            "disabled".to_string()
        }
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = curfew_config::load_settings(cli.config.as_deref());
    init_telemetry(&cli, settings.as_ref().is_ok_and(|s| s.debug));

    info!(version = env!("CARGO_PKG_VERSION"), "curfew starting");

    let result = match settings {
        Err(e) => Err(anyhow::Error::new(e).context("invalid configuration")),
        Ok(settings) => {
            info!(
                interval_secs = settings.flip_interval.as_secs_f64(),
                debug = settings.debug,
                metrics = settings.metrics.enabled,
                "configuration loaded"
            );
            match cli.command.unwrap_or(Commands::Run) {
                Commands::Run => run::run(settings).await,
                Commands::Check => {
                    check(&settings);
                    Ok(())
                },
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "curfew exited with an error");
            ExitCode::FAILURE
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(None, false, "info")]
    #[case(None, true, "debug")]
    #[case(Some("warn"), true, "warn")]
    #[case(Some("curfew=trace"), false, "curfew=trace")]
    fn log_directive(#[case] level: Option<&str>, #[case] debug: bool, #[case] expected: &str) {
        assert_eq!(default_directive(level, debug), expected);
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["curfew"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json_logs);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "curfew",
            "check",
            "--log-level",
            "debug",
            "--json-logs",
            "--config",
            "/etc/curfew.toml",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/curfew.toml")));
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
