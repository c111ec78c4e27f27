use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use producthunt_client::ProductHuntClient;
use radar_core::{
    AppConfig, ConfigError, CoreError, ErrorExt, ErrorReporter, LogFileConfig, ScheduledMode,
};
use radar_service::{
    run_daily, DailySchedule, Pipeline, RotateStrategy, RunMode, RunOptions, RunReport,
    StatePaths, DEFAULT_FETCH_LIMIT,
};
use std::process::ExitCode;
use std::time::Duration;
use telegram_client::TelegramChannel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LIVE_MESSAGE: &str = "Fintech Radar Bot is live 🚀";

const WORKSPACE_CRATES: [&str; 7] = [
    "fintech_radar",
    "radar_core",
    "producthunt_client",
    "relevance_engine",
    "state_store",
    "telegram_client",
    "radar_service",
];

#[derive(Parser)]
#[command(name = "fintech-radar")]
#[command(about = "Posts relevant fintech launches from Product Hunt to a Telegram channel")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Format messages without sending or touching saved state
    #[arg(long, global = true)]
    dry_run: bool,

    /// Look back this many hours instead of the mode's default window
    #[arg(long, global = true)]
    hours: Option<u32>,

    /// Maximum number of launches to fetch
    #[arg(long, global = true, default_value_t = DEFAULT_FETCH_LIMIT)]
    limit: usize,

    /// Number of launches to send in discover mode
    #[arg(long, global = true)]
    top: Option<usize>,

    /// Verbose logs and per-launch scoring rationale
    #[arg(long, global = true)]
    debug: bool,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            hours: self.hours,
            limit: self.limit,
            top: self.top,
            debug: self.debug,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Post one launch by its Product Hunt slug
    Post { slug: String },

    /// Look a launch up by name and post it
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Post the single best launch of the last day
    Best,

    /// Post the top launches that pass the strict B2B gate
    Discover,

    /// Post one launch from the finance subcategory rotation
    Rotate {
        #[arg(long, value_enum, default_value_t = StrategyArg::RoundRobin)]
        strategy: StrategyArg,
    },

    /// Run the configured mode every day at POST_TIME
    Schedule,

    /// Check bot access to the channel and send a test message
    Ping,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    RoundRobin,
    Random,
}

impl From<StrategyArg> for RotateStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::RoundRobin => RotateStrategy::RoundRobin,
            StrategyArg::Random => RotateStrategy::Random,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            let _log_guard = init_logging("info", cli.run.debug, None);
            ErrorReporter::new().report_error(&e);
            eprintln!("❌ {}", e.user_friendly_message());
            return ExitCode::from(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, cli.run.debug, Some(&config.log));
    config.log_summary();
    tracing::info!("Starting Fintech Radar");

    match run(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            report_failure(&e);
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins; otherwise `level` (or `debug`) for the workspace crates.
///
/// With a log file configured, output also goes to a daily-rotated file.
/// The returned guard flushes it and must live until exit.
fn init_logging(
    level: &str,
    debug: bool,
    log_file: Option<&LogFileConfig>,
) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug { "debug" } else { level };
        let directives: Vec<String> = WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect();
        EnvFilter::try_new(format!("warn,{}", directives.join(",")))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let mut guard = None;
    let file_layer = log_file.and_then(|log| {
        let (dir, prefix) = log.parts()?;
        let appender = rolling::Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .max_log_files(log.retention_days)
            .build(&dir);
        match appender {
            Ok(appender) => {
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                Some(fmt::layer().with_writer(writer).with_ansi(false))
            }
            Err(e) => {
                eprintln!(
                    "⚠️  Logging to console only, cannot open log file in {}: {}",
                    dir.display(),
                    e
                );
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    guard
}

fn report_failure(error: &anyhow::Error) {
    let reporter = ErrorReporter::new();
    let message = if let Some(e) = error.downcast_ref::<CoreError>() {
        reporter.report_error(e);
        e.user_friendly_message()
    } else if let Some(e) = error.downcast_ref::<ConfigError>() {
        reporter.report_error(e);
        e.user_friendly_message()
    } else {
        tracing::error!("{:#}", error);
        format!("{:#}", error)
    };
    eprintln!("❌ {}", message);
}

async fn run(cli: Cli, config: &AppConfig) -> Result<ExitCode> {
    let options = cli.run.options();

    let mode = match cli.command {
        Commands::Ping => return ping(config).await,
        Commands::Schedule => return schedule(config, options).await,
        Commands::Post { slug } => RunMode::Post { slug },
        Commands::Search { query } => RunMode::Search {
            query: query.join(" "),
        },
        Commands::Best => RunMode::Best,
        Commands::Discover => RunMode::Discover,
        Commands::Rotate { strategy } => RunMode::Rotate {
            strategy: strategy.into(),
        },
    };

    let pipeline = build_pipeline(config, options.dry_run)?;
    let report = pipeline
        .run(&mode, &options)
        .await
        .with_context(|| format!("{} run failed", mode.name()))?;

    print_report(&report, options.debug);
    Ok(match report.exit_code() {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::from(1),
    })
}

fn telegram_channel(config: &AppConfig) -> Result<TelegramChannel> {
    let credentials = config.require_telegram()?;
    let channel = TelegramChannel::new(credentials, Duration::from_secs(config.http.timeout_secs))
        .context("Failed to build Telegram client")?;
    Ok(channel)
}

fn build_pipeline(
    config: &AppConfig,
    dry_run: bool,
) -> Result<Pipeline<ProductHuntClient, TelegramChannel>> {
    let token = config.require_producthunt_token()?;
    let source = ProductHuntClient::new(token, &config.http)
        .context("Failed to build Product Hunt client")?;
    let channel = if dry_run {
        None
    } else {
        Some(telegram_channel(config)?)
    };

    let mut pipeline = Pipeline::new(source, channel, StatePaths::from_config(config));
    if let Some(subcategories) = &config.subcategories {
        pipeline = pipeline.with_subcategories(subcategories.clone());
    }
    Ok(pipeline)
}

fn print_report(report: &RunReport, debug: bool) {
    if debug && !report.rationale.is_empty() {
        println!("Scoring:");
        for entry in &report.rationale {
            println!("  {}: {}", entry.name, entry.breakdown);
        }
        println!();
    }

    println!("{}", report);

    for preview in &report.previews {
        println!("\n----- preview -----\n{}", preview);
    }
}

async fn ping(config: &AppConfig) -> Result<ExitCode> {
    let channel = telegram_channel(config)?;
    let (bot, chat) = channel
        .test_connection()
        .await
        .context("Telegram connection test failed")?;
    channel
        .send_text(LIVE_MESSAGE)
        .await
        .context("Failed to send test message")?;

    println!(
        "✅ @{} can post to {}",
        bot.username.as_deref().unwrap_or("bot"),
        chat.title.as_deref().unwrap_or(channel.chat_id())
    );
    Ok(ExitCode::SUCCESS)
}

async fn schedule(config: &AppConfig, mut options: RunOptions) -> Result<ExitCode> {
    let mode = match config.schedule.mode {
        ScheduledMode::Discover => RunMode::Discover,
        ScheduledMode::Best => RunMode::Best,
        ScheduledMode::Rotate => RunMode::Rotate {
            strategy: RotateStrategy::RoundRobin,
        },
    };
    options.top = options.top.or(Some(config.schedule.top));

    let pipeline = build_pipeline(config, options.dry_run)?;
    let schedule = DailySchedule {
        post_time: config.schedule.post_time,
        timezone: config.schedule.timezone,
        mode,
        options,
    };

    println!(
        "🚀 Scheduling daily {} runs at {} {}",
        schedule.mode.name(),
        schedule.post_time,
        schedule.timezone
    );
    run_daily(&pipeline, &schedule).await?;
    println!("🛑 Scheduler stopped");
    Ok(ExitCode::SUCCESS)
}
