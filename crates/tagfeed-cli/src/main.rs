use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use tagfeed_model::{
    default_user_agent, FeedConfig, DEFAULT_FEED_BASE_URL, DEFAULT_LINK_PATH, DEFAULT_OUTPUT_PATH,
    DEFAULT_TITLE_PATH,
};
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};

mod pipeline;

#[derive(Parser)]
#[command(name = "tagfeed")]
#[command(
    about = "Fetch the syndication feed for a topic tag and write its items as an HTML listing"
)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Feed topic tag, appended verbatim to the base URL (e.g., "rust")
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    tag: String,

    /// Feed service URL the tag is appended to
    #[arg(long, env = "TAGFEED_BASE_URL", default_value = DEFAULT_FEED_BASE_URL)]
    base_url: String,

    /// Output file for the HTML listing (overwritten)
    #[arg(short, long, env = "TAGFEED_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Give up on the download after this many seconds (default: wait indefinitely)
    #[arg(long, env = "TAGFEED_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Fail when the feed has a different number of titles and links
    #[arg(long)]
    strict: bool,

    /// Node path selecting item titles
    #[arg(long, default_value = DEFAULT_TITLE_PATH)]
    title_path: String,

    /// Node path selecting item links
    #[arg(long, default_value = DEFAULT_LINK_PATH)]
    link_path: String,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Cli {
    fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            feed_base_url: self.base_url.clone(),
            output_path: self.output.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            user_agent: default_user_agent(),
            strict_pairing: self.strict,
            title_path: self.title_path.clone(),
            link_path: self.link_path.clone(),
        }
    }
}

fn init_tracing(level: &LogLevel, utc: bool) -> anyhow::Result<()> {
    // Keep HTTP internals quiet unless tracing everything
    let level = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug,hyper_util=info,rustls=info",
        LogLevel::Trace => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = if utc {
        let timer = ChronoUtc::new(time_format.to_string());
        builder.with_timer(timer).try_init()
    } else {
        let timer = ChronoLocal::new(time_format.to_string());
        builder.with_timer(timer).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.utc) {
        eprintln!("tagfeed: {e:#}");
        return ExitCode::FAILURE;
    }

    let config = cli.feed_config();
    tracing::debug!(?config, "Resolved configuration");

    match pipeline::run(&config, &cli.tag).await {
        Ok(report) => {
            tracing::info!(
                tag = %cli.tag,
                status = report.status,
                bytes = report.bytes,
                items = report.items,
                path = %report.output_path.display(),
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(tag = %cli.tag, "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
