use std::{process::ExitCode, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use secretload::{
    AggregatedMetrics, Dispatcher, HttpSecretAccessor, StressError, Stressor,
    config::{self, StressOptions},
    report::{AnyReporter, JsonReporter, TracingReporter},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "secretload", version)]
#[command(about = "Stress test a secret manager", long_about = None)]
struct Cli {
    /// Log line format
    #[arg(long, global = true, env = "STRESS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one secret concurrently until interrupted (Ctrl+C or SIGTERM)
    Stress(StressArgs),
}

#[derive(clap::Args, Debug)]
struct StressArgs {
    /// Number of concurrent reads
    #[arg(short = 'p', long, env = "STRESS_PARALLELISM", default_value_t = config::DEFAULT_PARALLELISM)]
    parallelism: usize,

    /// Project id
    #[arg(short = 'P', long, env = "STRESS_PROJECT", default_value = config::DEFAULT_PROJECT)]
    project: String,

    /// Secret name
    #[arg(short = 's', long, env = "STRESS_SECRET", default_value = config::DEFAULT_SECRET)]
    secret: String,

    /// Secret manager base URL
    #[arg(long, env = "STRESS_ENDPOINT", default_value = config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Bearer token sent with every request
    #[arg(long, env = "STRESS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "STRESS_TIMEOUT_SECS", default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Where the final summary goes
    #[arg(long, env = "STRESS_OUTPUT", value_enum, default_value_t = Output::Log)]
    output: Output,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Output {
    /// A structured log event
    Log,
    /// Pretty JSON on stdout
    Json,
}

impl StressArgs {
    fn options(self) -> StressOptions {
        StressOptions {
            parallelism: self.parallelism,
            project: self.project,
            secret: self.secret,
            endpoint: self.endpoint,
            access_token: self.access_token,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for the JSON report.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Cancel `token` on the first Ctrl+C or SIGTERM.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C"),
            _ = terminate => tracing::info!("Received SIGTERM"),
        }
        token.cancel();
    });
}

async fn run(args: StressArgs) -> Result<AggregatedMetrics, StressError> {
    let output = args.output;
    let config = args.options().into_config()?;
    tracing::debug!(?config, "stress called");

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let reporter = match output {
        Output::Log => AnyReporter::Tracing(TracingReporter),
        Output::Json => AnyReporter::Json(JsonReporter),
    };
    Dispatcher::new(HttpSecretAccessor::from_config(&config), reporter)
        .stress(cancel, &config)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let Command::Stress(args) = cli.command;
    match run(args).await {
        Ok(_) => {
            tracing::info!("stress test completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "stress test failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "secretload", "stress", "-p", "3", "-P", "proj", "-s", "key", "--timeout-secs", "7",
        ])
        .unwrap();
        let Command::Stress(args) = cli.command;
        let config = args.options().into_config().unwrap();
        assert_eq!(config.parallelism().get(), 3);
        assert_eq!(config.target(), "projects/proj/secrets/key/versions/latest");
        assert_eq!(config.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn zero_parallelism_parses_but_fails_the_run() {
        let cli = Cli::try_parse_from(["secretload", "stress", "--parallelism", "0"]).unwrap();
        let Command::Stress(args) = cli.command;
        let err = run(args).await.unwrap_err();
        assert!(matches!(
            err,
            StressError::Config(secretload::ConfigError::ZeroParallelism)
        ));
    }
}
