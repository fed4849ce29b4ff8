use clap::{Parser, ValueEnum};
use console::{Term, set_colors_enabled, style};
use std::io::{self, IsTerminal};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, prelude::*};

use ntpman::adapters::reverse::ReverseResolver;
use ntpman::stats::StatsCollector;
use ntpman::tui::{TuiApp, run_tui};
use ntpman::{
    LoadPolicy, NtpmanError, PollLoop, PollReport, ProbeConfig, QueryEngine, Reporter, fmt,
    load_targets,
};

#[path = "ntpman/config_store.rs"]
mod config_store;

use config_store::ConfigStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Tui,
}

#[derive(Parser, Debug)]
#[command(name = "ntpman")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Poll a list of NTP servers and report RTT, stratum and reference ids")]
struct Args {
    /// Target list: one host[:port] per line, '#' starts a comment
    #[arg(index = 1)]
    configfile: PathBuf,

    /// Local source port (default: ephemeral)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind IPv6 and resolve IPv6 addresses only
    #[arg(short = '6', long)]
    ipv6: bool,

    /// Timeout of one exchange in seconds [default: 1]
    #[arg(short = 't', long)]
    timeout: Option<f64>,

    /// Delay between two targets in seconds [default: 1]
    #[arg(short = 'i', long)]
    delay: Option<f64>,

    /// Number of passes over the list (default: until interrupted)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u32).range(1..))]
    count: Option<u32>,

    /// Output format [default: text]
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Alias for JSON output
    #[arg(short = 'j', long)]
    json: bool,

    /// Skip target lines that do not resolve instead of aborting
    #[arg(long)]
    skip_unresolved: bool,

    /// Do not look up names of responders
    #[arg(short = 'n', long)]
    numeric: bool,

    /// Show detailed output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color", alias = "nocolor")]
    no_color: bool,
}

/// Prints reports as they arrive and keeps per-target statistics.
struct TermReporter {
    term: Term,
    format: OutputFormat,
    verbose: bool,
    stats: StatsCollector,
}

impl Reporter for TermReporter {
    fn report(&mut self, report: PollReport) -> ControlFlow<()> {
        self.stats.record(&report);
        match self.format {
            OutputFormat::Json => match fmt::json::report_to_json(&report, false) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("error serializing: {}", e),
            },
            _ => {
                let line = fmt::text::render_report(&report, self.verbose);
                self.term.write_line(&line).ok();
            }
        }
        ControlFlow::Continue(())
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let err_term = Term::stderr();

    let store = match ConfigStore::load() {
        Ok(store) => store,
        Err(e) => {
            fail(&err_term, &format!("{}", e));
            process::exit(1);
        }
    };
    let defaults = store.defaults().clone();

    let mut format = args
        .format
        .or_else(|| {
            defaults
                .format
                .as_deref()
                .and_then(|f| OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or(OutputFormat::Text);
    if args.json {
        format = OutputFormat::Json;
    }

    init_tracing(format);
    debug!(path = %store.path().display(), "config store loaded");
    if let Some(f) = defaults.format.as_deref() {
        if OutputFormat::from_str(f, true).is_err() {
            warn!(format = f, "ignoring unknown default format");
        }
    }

    let want_color = format == OutputFormat::Text
        && io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
        && !args.no_color;
    set_colors_enabled(want_color);

    let config = match build_config(&args, &defaults) {
        Ok(config) => config,
        Err(msg) => {
            fail(&err_term, &msg);
            process::exit(2);
        }
    };

    let targets = match load_targets(&args.configfile, config.ipv6, config.policy) {
        Ok(targets) => targets,
        Err(e) => process::exit(handle_error(&err_term, e)),
    };

    let engine = match QueryEngine::bind(config.bind_port, config.ipv6).await {
        Ok(engine) => engine,
        Err(e) => process::exit(handle_error(&err_term, e)),
    };
    let local_addr = engine
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();

    let mut poll = PollLoop::new(engine, targets, config.poll_settings());
    if config.reverse_dns {
        match ReverseResolver::from_system() {
            Ok(reverse) => poll = poll.with_reverse_resolver(reverse),
            Err(e) => warn!(error = %e, "reverse lookups disabled"),
        }
    }

    match format {
        OutputFormat::Tui => run_tui_mode(poll, local_addr),
        _ => {
            let mut reporter = TermReporter {
                term: Term::stdout(),
                format,
                verbose: args.verbose,
                stats: StatsCollector::default(),
            };
            tokio::select! {
                passes = poll.run(&mut reporter) => debug!(passes, "poll loop finished"),
                _ = signal::ctrl_c() => debug!("interrupted"),
            }
            print_summary(&reporter, poll.targets().len());
        }
    }

    process::exit(0);
}

fn init_tracing(format: OutputFormat) {
    let from_env = EnvFilter::try_from_default_env();
    // the TUI owns the terminal, only log there when asked to
    if format == OutputFormat::Tui && from_env.is_err() {
        return;
    }
    tracing_subscriber::registry()
        .with(from_env.unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(log_fmt::layer().with_writer(io::stderr))
        .init();
}

fn build_config(args: &Args, defaults: &config_store::Defaults) -> Result<ProbeConfig, String> {
    let base = ProbeConfig::default();
    let timeout = match args.timeout.or(defaults.timeout) {
        Some(secs) => seconds(secs, "timeout")?,
        None => base.timeout,
    };
    if timeout.is_zero() {
        return Err("--timeout must be greater than zero".into());
    }
    let delay = match args.delay.or(defaults.delay) {
        Some(secs) => seconds(secs, "delay")?,
        None => base.delay,
    };

    Ok(ProbeConfig {
        bind_port: args.port,
        ipv6: args.ipv6 || defaults.ipv6_only.unwrap_or(false),
        timeout,
        delay,
        passes: args.count,
        policy: if args.skip_unresolved {
            LoadPolicy::SkipInvalid
        } else {
            LoadPolicy::Strict
        },
        reverse_dns: !args.numeric,
    })
}

fn seconds(value: f64, name: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| format!("--{name} must be a non-negative number of seconds, got {value}"))
}

fn run_tui_mode(mut poll: PollLoop, local_addr: String) {
    let names = poll.targets().iter().map(|t| t.name.clone()).collect();
    let mut tui_app = TuiApp::new(names, local_addr);

    // Channel between the poll task and the TUI
    let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PollReport>();
    tokio::spawn(async move {
        poll.run(&mut tx).await;
    });

    let res = run_tui(&mut tui_app, |app| {
        app.drain(&mut rx);
        Ok(true)
    });
    if let Err(e) = res {
        fail(&Term::stderr(), &format!("terminal: {}", e));
        process::exit(1);
    }
}

fn print_summary(reporter: &TermReporter, target_count: usize) {
    if reporter.stats.total() <= target_count {
        return;
    }
    let summary = reporter.stats.summary();
    match reporter.format {
        OutputFormat::Json => match fmt::json::stats_list_to_json(&summary, false) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serializing: {}", e),
        },
        _ => {
            for (name, st) in &summary {
                reporter
                    .term
                    .write_line(&fmt::text::render_stats(name, st))
                    .ok();
            }
        }
    }
}

fn fail(term: &Term, msg: &str) {
    term.write_line(&style(format!("Error: {}", msg)).red().to_string())
        .ok();
}

fn handle_error(term: &Term, err: NtpmanError) -> i32 {
    fail(term, &err.to_string());
    match err {
        NtpmanError::AddressResolutionFailed(_) => 2,
        NtpmanError::SocketBindFailed(_) => 3,
        _ => 1,
    }
}
