mod config;
mod display;
mod interactive;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use json_adapter::JsonFileWriter;
use messages_core::application::{MessageExportService, RunOptions};
use messages_core::domain::{MessageRecord, Retrieval, Strategy};
use messages_core::utils::{default_output_file, parse_date_bound};
use slack_adapter::SlackMessageSource;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::interactive::Prompter;

/// CLI tool to export one user's Slack messages from a channel
#[derive(Parser, Debug)]
#[command(name = "slack-messages")]
#[command(about = "Retrieves a user's messages from a Slack channel and saves them as JSON")]
struct Cli {
    /// Retrieval method; prompts for everything when omitted on a terminal
    #[arg(short = 's', long = "strategy", value_enum)]
    strategy: Option<StrategyArg>,

    /// Maximum number of messages (search defaults to 100, history to no limit)
    #[arg(short = 'n', long = "limit")]
    limit: Option<usize>,

    /// Earliest message time, e.g. 2025-04-01 or "2025-04-01 10:30:00" (UTC)
    #[arg(long = "since")]
    since: Option<String>,

    /// Messages strictly before this time (UTC)
    #[arg(long = "until")]
    until: Option<String>,

    /// Where to write the JSON file [default: <user>_slack_messages_<channel>.json]
    #[arg(short = 'o', long = "output-file")]
    output_file: Option<PathBuf>,

    /// Print the messages without saving them
    #[arg(long = "no-save")]
    no_save: bool,

    /// Ask for the options interactively
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Channel to read instead of SLACK_CHANNEL_ID
    #[arg(long = "channel")]
    channel: Option<String>,

    /// User to export instead of SLACK_USER_ID
    #[arg(long = "user")]
    user: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    /// search.messages with author and channel filters
    Search,
    /// conversations.history, filtered locally
    History,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Search => Strategy::DirectSearch,
            StrategyArg::History => Strategy::FullFetch,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = e
                .downcast_ref::<messages_core::Error>()
                .and_then(messages_core::Error::hint)
            {
                eprintln!("Hint: {hint}");
            }
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(channel) = cli.channel.clone() {
        config.channel_id = channel;
    }
    if let Some(user) = cli.user.clone() {
        config.user_id = user;
    }
    info!(
        channel = %config.channel_id,
        user = %config.user_id,
        token = %config.masked_token(),
        "configuration loaded"
    );

    let interactive =
        cli.interactive || (cli.strategy.is_none() && io::stdin().is_terminal());
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    let options = if interactive {
        prompter.ask_run_options()?
    } else {
        options_from_flags(&cli)?
    };

    // Instantiate concrete implementations of secondary adapters
    let source = SlackMessageSource::new(
        config.token.clone(),
        config.api_base_url.clone(),
        config.request_timeout,
    )?;
    let output_file = cli
        .output_file
        .clone()
        .unwrap_or_else(|| default_output_file(&config.user_id, &config.channel_id));
    let writer = JsonFileWriter::new(output_file);

    // Instantiate the core business service with dependency injection
    let service = MessageExportService::new(Box::new(source), Box::new(writer));
    let request = options.request_for(&config.user_id, &config.channel_id);

    if !interactive {
        let summary = service
            .run(&options, &request)
            .with_context(|| format!("{} retrieval failed", options.strategy))?;
        show(&summary.retrieval, options.strategy, &config.user_id)?;
        if let Some(path) = summary.written_to {
            println!(
                "Saved {} messages to {}",
                summary.retrieval.records.len(),
                path.display()
            );
        }
        return Ok(());
    }

    let retrieval = service
        .retrieve(options.strategy, &request)
        .with_context(|| format!("{} retrieval failed", options.strategy))?;
    show(&retrieval, options.strategy, &config.user_id)?;

    if let Some(path) = save_if_confirmed(&mut prompter, &service, &retrieval.records)? {
        println!(
            "Saved {} messages to {}",
            retrieval.records.len(),
            path.display()
        );
    }

    Ok(())
}

/// Asks before saving; returns the written path when the operator agreed.
fn save_if_confirmed<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    service: &MessageExportService,
    records: &[MessageRecord],
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }
    if !prompter.confirm("\nSave the messages to a JSON file? (y/n): ")? {
        return Ok(None);
    }
    Ok(Some(service.save(records)?))
}

fn show(retrieval: &Retrieval, strategy: Strategy, user_id: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    display::print_messages(&mut stdout, &retrieval.records, user_id)?;
    if strategy == Strategy::FullFetch {
        display::print_statistics(&mut stdout, retrieval, user_id)?;
    }
    stdout.flush()
}

fn options_from_flags(cli: &Cli) -> Result<RunOptions> {
    let since = cli
        .since
        .as_deref()
        .map(parse_date_bound)
        .transpose()
        .context("invalid --since")?;
    let until = cli
        .until
        .as_deref()
        .map(parse_date_bound)
        .transpose()
        .context("invalid --until")?;

    Ok(RunOptions {
        strategy: cli.strategy.map(Strategy::from).unwrap_or(Strategy::DirectSearch),
        limit: cli.limit,
        since,
        until,
        save: !cli.no_save,
    })
}
