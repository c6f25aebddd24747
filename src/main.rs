//! CLI entry point for `refundscan`.

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use refundscan::command::error_message;
use refundscan::config::{self, Config};
use refundscan::fetch::{FetchMode, FetchProgress, Orchestrator, RefundSource};
use refundscan::model::candidate::Candidate;
use refundscan::present::session::Session;
use refundscan::present::{self, RenderedView, ViewInput, ViewMode};
use refundscan::store::json_file::JsonFileStore;
use refundscan::store::results::{ResultStore, StoreDefaults};

#[derive(Parser)]
#[command(
    name = "refundscan",
    version,
    about = "Find return and refund emails in your Gmail, grouped by sender"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the terminal UI (default)
    Tui,
    /// Scan the mailbox (or replay samples) and cache the results
    Scan {
        /// Scan window in days [default: stored window]
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Replay the built-in samples
        #[arg(long, conflicts_with = "live")]
        simulate: bool,
        /// Search the real mailbox
        #[arg(long)]
        live: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show cached results of a scan window
    List {
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Show suppressed messages instead of active ones
        #[arg(long)]
        suppressed: bool,
        #[arg(long)]
        json: bool,
    },
    /// Hide a message from the active view
    Suppress { id: String },
    /// Bring a suppressed message back
    Restore { id: String },
    /// Fold or unfold a sender group
    ToggleSender { key: String },
    /// Collapse all sender groups, or expand them if all are collapsed
    ToggleAll,
    /// Set the scan window in days
    Period {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
    },
    /// Switch between sample replay (on) and live Gmail (off)
    DevMode {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Open a message in the browser
    Open { id: String },
    /// Answer JSON fetch commands on stdin/stdout
    Serve,
    /// Print the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config, logs_to_stderr(cli.command.as_ref()));

    match cli.command {
        None | Some(Commands::Tui) => refundscan::tui::run_tui(&config, open_store(&config)),
        Some(Commands::Scan {
            days,
            simulate,
            live,
            json,
        }) => cmd_scan(&config, days, simulate, live, json),
        Some(Commands::List {
            days,
            suppressed,
            json,
        }) => cmd_list(&config, days, suppressed, json),
        Some(Commands::Suppress { id }) => cmd_suppress(&config, &id, true),
        Some(Commands::Restore { id }) => cmd_suppress(&config, &id, false),
        Some(Commands::ToggleSender { key }) => cmd_toggle_sender(&config, &key),
        Some(Commands::ToggleAll) => cmd_toggle_all(&config),
        Some(Commands::Period { days }) => cmd_period(&config, days),
        Some(Commands::DevMode { state }) => cmd_dev_mode(&config, matches!(state, Switch::On)),
        Some(Commands::Open { id }) => cmd_open(&config, &id),
        Some(Commands::Serve) => cmd_serve(&config),
        Some(Commands::Config { init }) => cmd_config(&config, init),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with optional stderr output and optional file logging.
///
/// The terminal UI owns the screen, so it only logs to the file.
fn setup_logging(level: &str, config: &Config, to_stderr: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer =
        to_stderr.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    // Try to set up file logging
    let log_dir = config::data_dir(config);
    let file_layer = std::fs::create_dir_all(&log_dir).is_ok().then(|| {
        let file_appender = tracing_appender::rolling::never(&log_dir, "refundscan.log");
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// Whether log lines may go to stderr while `command` runs.
fn logs_to_stderr(command: Option<&Commands>) -> bool {
    !matches!(command, None | Some(Commands::Tui))
}

/// Persisted state in the data directory.
fn open_store(config: &Config) -> ResultStore {
    let kv = JsonFileStore::open(config::state_file_path(config));
    ResultStore::new(
        Arc::new(kv),
        StoreDefaults {
            dev_mode: config.general.dev_mode,
            period_days: config.general.default_period_days,
        },
    )
}

fn scan_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Scanning [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

/// Session over the stored state; opening it may fetch.
fn open_session(config: &Config, store: ResultStore) -> anyhow::Result<Session<Orchestrator>> {
    let orchestrator = Orchestrator::from_config(config, store.clone())?;
    Ok(Session::new(store, orchestrator).with_sender_name_max(config.display.sender_name_max))
}

/// Run a session operation that may fetch, with a progress bar.
fn with_progress<S: RefundSource>(
    session: &mut Session<S>,
    op: impl FnOnce(&mut Session<S>, Option<&dyn Fn(FetchProgress)>),
) -> anyhow::Result<()> {
    let pb = scan_progress_bar();
    let on_progress = |p: FetchProgress| {
        pb.set_length(p.total as u64);
        pb.set_position(p.done as u64);
    };
    op(session, Some(&on_progress));
    pb.finish_and_clear();

    match session.last_error() {
        Some(err) => anyhow::bail!("{err}"),
        None => Ok(()),
    }
}

fn cmd_scan(
    config: &Config,
    days: Option<u32>,
    simulate: bool,
    live: bool,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(config);
    let days = days.unwrap_or_else(|| store.period_days());
    let mode = if simulate {
        FetchMode::Simulated
    } else if live {
        FetchMode::Live
    } else {
        FetchMode::from_dev_mode(store.dev_mode())
    };

    let orchestrator = Orchestrator::from_config(config, store.clone())?;
    let pb = scan_progress_bar();
    let result = orchestrator.fetch(
        days,
        mode,
        Some(&|p: FetchProgress| {
            pb.set_length(p.total as u64);
            pb.set_position(p.done as u64);
        }),
    );
    pb.finish_and_clear();

    let results = result.map_err(|e| anyhow::anyhow!(error_message(&e)))?;
    print_results(config, &store, &results, ViewMode::Active, json)
}

fn cmd_list(config: &Config, days: Option<u32>, suppressed: bool, json: bool) -> anyhow::Result<()> {
    let store = open_store(config);
    let days = days.unwrap_or_else(|| store.period_days());
    let Some(cached) = store.cached_results(days) else {
        println!("No cached results for {days} days. Run `refundscan scan --days {days}`.");
        return Ok(());
    };

    if !json {
        let when = present::format_date(cached.fetched_at_date(), &config.display.date_format);
        println!("  Last {days} days, fetched {when}");
        println!();
    }
    let mode = if suppressed {
        ViewMode::Suppressed
    } else {
        ViewMode::Active
    };
    print_results(config, &store, &cached.results, mode, json)
}

fn cmd_suppress(config: &Config, id: &str, suppress: bool) -> anyhow::Result<()> {
    let store = open_store(config);
    let mut ids = store.suppressed();
    let changed = if suppress {
        ids.insert(id.to_string())
    } else {
        ids.remove(id)
    };
    store.set_suppressed(&ids);

    match (suppress, changed) {
        (true, true) => println!("Suppressed {id}"),
        (true, false) => println!("{id} was already suppressed"),
        (false, true) => println!("Restored {id}"),
        (false, false) => println!("{id} was not suppressed"),
    }
    Ok(())
}

fn cmd_toggle_sender(config: &Config, key: &str) -> anyhow::Result<()> {
    let store = open_store(config);
    let mut keys = store.collapsed();
    if keys.remove(key) {
        println!("Expanded {key}");
    } else {
        keys.insert(key.to_string());
        println!("Collapsed {key}");
    }
    store.set_collapsed(&keys);
    Ok(())
}

fn cmd_toggle_all(config: &Config) -> anyhow::Result<()> {
    let mut session = open_session(config, open_store(config))?;
    with_progress(&mut session, |s, p| s.open(p))?;
    session.toggle_all();
    if session.view().all_collapsed {
        println!("Collapsed {} sender(s)", session.collapsed().len());
    } else {
        println!("Expanded all senders");
    }
    Ok(())
}

fn cmd_period(config: &Config, days: u32) -> anyhow::Result<()> {
    if days == 0 {
        anyhow::bail!("The scan window must be at least one day");
    }
    let mut session = open_session(config, open_store(config))?;
    with_progress(&mut session, |s, p| s.set_period(days, p))?;
    println!(
        "Scan window set to {days} days ({} message(s))",
        session.view().item_count()
    );
    Ok(())
}

fn cmd_dev_mode(config: &Config, on: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, open_store(config))?;
    with_progress(&mut session, |s, p| s.set_dev_mode(on, p))?;
    let source = if on { "built-in samples" } else { "live Gmail" };
    println!(
        "Dev mode {} ({source}, {} message(s))",
        if on { "on" } else { "off" },
        session.view().item_count()
    );
    Ok(())
}

fn cmd_open(config: &Config, id: &str) -> anyhow::Result<()> {
    let url = present::message_url(&config.gmail.web_base_url, id);
    open::that(&url)?;
    println!("Opened {url}");
    Ok(())
}

fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config);
    let orchestrator = Orchestrator::from_config(config, store)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    refundscan::command::serve(&orchestrator, stdin.lock(), stdout.lock())?;
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config::save_config(&Config::default())?;
        println!("Wrote {}", path.display());
        return Ok(());
    }
    if let Some(path) = config::config_file_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "refundscan", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print candidates as grouped text or as a JSON array of the visible items.
fn print_results(
    config: &Config,
    store: &ResultStore,
    results: &[Candidate],
    mode: ViewMode,
    json: bool,
) -> anyhow::Result<()> {
    let suppressed = store.suppressed();
    let collapsed = BTreeSet::new();
    let view = present::render(&ViewInput {
        candidates: results,
        suppressed: &suppressed,
        collapsed: &collapsed,
        mode,
        sender_name_max: config.display.sender_name_max,
    });

    if json {
        let items: Vec<&Candidate> = view.groups.iter().flat_map(|g| g.items.iter()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_view(&view, &config.display.date_format);
    }
    Ok(())
}

fn print_view(view: &RenderedView, date_format: &str) {
    if let Some(message) = view.empty_message {
        println!("{message}");
        return;
    }
    if view.groups.is_empty() {
        println!("Nothing to show.");
        return;
    }

    for group in &view.groups {
        let when = present::format_timestamp_ms(group.most_recent, date_format);
        let mut header = format!("{} <{}>  {}", group.display_name, group.email, group.count_label());
        if !when.is_empty() {
            header.push_str(&format!(" \u{00b7} {when}"));
        }
        println!("{header}");

        for item in &group.items {
            let subject = if item.subject.is_empty() {
                "(no subject)"
            } else {
                item.subject.as_str()
            };
            println!(
                "  {:<16} {:<17} {subject}",
                item.status.label(),
                present::format_date(item.date, date_format)
            );
            println!("  {:<16} id: {}", "", item.id);
            if !item.snippet.is_empty() {
                let snippet = refundscan::parser::text::truncate_chars(&item.snippet, 160);
                println!("    {}", snippet.replace('\n', " "));
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_logs_to_file_only() {
        assert!(!logs_to_stderr(None));
        assert!(!logs_to_stderr(Some(&Commands::Tui)));
        assert!(logs_to_stderr(Some(&Commands::Serve)));
        assert!(logs_to_stderr(Some(&Commands::ToggleAll)));
    }

    #[test]
    fn test_cli_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["refundscan", "-vv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_zero_day_window_is_rejected() {
        assert!(Cli::try_parse_from(["refundscan", "period", "0"]).is_err());
        assert!(Cli::try_parse_from(["refundscan", "scan", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["refundscan", "period", "30"]).is_ok());
    }
}
