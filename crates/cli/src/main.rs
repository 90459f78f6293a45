//! fluxcall CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: load the optional JSON [`ClientConfig`] and
//!    apply command-line overrides.
//! 2. **Wire observability**: install `tracing-subscriber` with an
//!    `EnvFilter` (`RUST_LOG`, default `warn`) and a pretty or JSON formatter
//!    on stderr.
//! 3. **Construct infrastructure**: a tokio runtime, an [`HttpService`], and
//!    one declared endpoint.
//! 4. **Run one call**: build a publisher in the chosen emission mode behind
//!    the chosen scheduler gate, collect its signals, and print one line per
//!    signal on stdout.
//!
//! Exit status is `0` when the stream completes, `1` when it ends in an
//! error signal, `2` when the call could not be set up at all, and `3` when
//! the stream did not terminate within `--wait-ms` (the call is canceled).

mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use fluxcall::{
    collect_blocking, CallAdapter, CallError, CallPublisher, CollectTimeout, Emission,
    EmissionStrategy, FailureTag, FallbackRegistry, ManualScheduler, Signal,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use transport::{ClientConfig, Endpoint, HttpService, TextDecoder, TokioScheduler};

#[derive(Debug, Parser)]
#[command(
    name = "fluxcall",
    version,
    about = "Perform one HTTP call as a reactive stream and print its signals"
)]
struct Arguments {
    /// Path resolved against the base URL, or an absolute URL.
    target: String,

    /// What the stream emits.
    #[arg(short, long, value_enum, default_value_t = Mode::Body)]
    mode: Mode,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Name of the API operation, visible to fallback handlers.
    #[arg(long)]
    endpoint: Option<String>,

    /// JSON client config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the config's base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides the config's request timeout (`0` = none).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Where the call is dispatched from.
    #[arg(long, value_enum, default_value_t = SchedulerKind::Immediate)]
    scheduler: SchedulerKind,

    /// How long to wait for the stream to terminate before canceling.
    #[arg(long, default_value_t = 60_000)]
    wait_ms: u64,

    /// Substitute value for a failure tag, `TAG=VALUE`. Repeatable.
    #[arg(long = "fallback")]
    fallbacks: Vec<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Body,
    Response,
    Result,
}

impl From<Mode> for EmissionStrategy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Body => EmissionStrategy::Body,
            Mode::Response => EmissionStrategy::Response,
            Mode::Result => EmissionStrategy::Result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchedulerKind {
    /// Dispatch on the subscribing thread.
    Immediate,
    /// Dispatch as a task on the I/O runtime.
    Tokio,
    /// Queue the dispatch and release it explicitly.
    Manual,
}

/// How the observed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Completed,
    Failed,
    TimedOut,
}

impl Finish {
    fn of(signals: &[Signal<Emission<String>, CallError>]) -> Self {
        if signals.iter().any(|s| matches!(s, Signal::Error(_))) {
            Finish::Failed
        } else {
            Finish::Completed
        }
    }

    fn code(self) -> u8 {
        match self {
            Finish::Completed => 0,
            Finish::Failed => 1,
            Finish::TimedOut => 3,
        }
    }
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    init_tracing(args.json_logs);

    match run(&args) {
        Ok(finish) => ExitCode::from(finish.code()),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs the call and prints its signals. Setup failures are errors; how
/// the stream ended is the returned [`Finish`].
fn run(args: &Arguments) -> Result<Finish> {
    let config = load_config(args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("fluxcall-io")
        .enable_all()
        .build()
        .context("failed to start the I/O runtime")?;

    let service = HttpService::new(config, runtime.handle().clone())
        .context("failed to build the HTTP client")?;
    let endpoint = declare(&service, args)?;
    let fallbacks = parse_fallbacks(&args.fallbacks)?;

    let manual = ManualScheduler::new();
    let adapter = match args.scheduler {
        SchedulerKind::Immediate => CallAdapter::create(),
        SchedulerKind::Tokio => {
            CallAdapter::with_scheduler(TokioScheduler::new(runtime.handle().clone()))
        }
        SchedulerKind::Manual => CallAdapter::with_scheduler(manual.clone()),
    };
    let publisher = adapter
        .publisher(args.mode.into(), endpoint.factory())
        .with_fallbacks(fallbacks);
    info!(
        request = %endpoint.descriptor(),
        mode = %publisher.strategy(),
        scheduler = ?args.scheduler,
        "running call"
    );

    let wait = Duration::from_millis(args.wait_ms);
    let collected = match args.scheduler {
        SchedulerKind::Manual => collect_with_manual_release(&publisher, &manual, wait)?,
        _ => collect_blocking(&publisher, wait),
    };
    let signals = match collected {
        Ok(signals) => signals,
        Err(timeout) => {
            warn!(%timeout, "call canceled");
            eprintln!("timeout: {timeout}");
            return Ok(Finish::TimedOut);
        }
    };

    for signal in &signals {
        println!("{}", render::render(signal));
    }
    Ok(Finish::of(&signals))
}

fn load_config(args: &Arguments) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.validate().context("invalid client configuration")?;
    Ok(config)
}

fn declare(service: &HttpService, args: &Arguments) -> Result<Endpoint<String>> {
    let mut builder = service.request(&args.method, &args.target);
    if let Some(name) = &args.endpoint {
        builder = builder.named(name.clone());
    }
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        builder = builder.header(name, value);
    }
    if let Some(data) = &args.data {
        builder = builder.body(data.clone().into_bytes());
    }
    builder
        .decode_with(TextDecoder)
        .with_context(|| format!("invalid request {} {}", args.method, args.target))
}

fn parse_header(header: &str) -> Result<(&str, &str)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| anyhow!("header '{header}' is not 'Name: value'"))?;
    Ok((name.trim(), value.trim()))
}

fn parse_fallbacks(entries: &[String]) -> Result<FallbackRegistry<String>> {
    let mut registry = FallbackRegistry::new();
    for entry in entries {
        let (tag, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("fallback '{entry}' is not 'TAG=VALUE'"))?;
        let tag = FailureTag::new(tag.trim())
            .ok_or_else(|| anyhow!("fallback '{entry}' has an empty tag"))?;
        let value = value.to_string();
        registry = registry.with(tag, move |_, _| Some(value.clone()));
    }
    Ok(registry)
}

/// Collects on a helper thread and releases the queued dispatch once the
/// subscription has registered it.
fn collect_with_manual_release(
    publisher: &CallPublisher<String>,
    scheduler: &ManualScheduler,
    wait: Duration,
) -> Result<Result<Vec<Signal<Emission<String>, CallError>>, CollectTimeout>> {
    std::thread::scope(|scope| {
        let collector = scope.spawn(|| collect_blocking(publisher, wait));
        while scheduler.pending() == 0 && !collector.is_finished() {
            std::thread::sleep(Duration::from_millis(1));
        }
        let released = scheduler.drain();
        debug!(released, "manual scheduler drained");
        collector
            .join()
            .map_err(|_| anyhow!("collector thread panicked"))
    })
}
