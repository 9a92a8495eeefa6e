//! Operator prompts. Only this module reads from the terminal; it turns the
//! answers into a `RunOptions`.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use messages_core::application::RunOptions;
use messages_core::domain::Strategy;
use messages_core::utils::parse_date_bound;

pub const DEFAULT_LIMIT: usize = 100;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `message` and reads one trimmed line; EOF reads as empty.
    pub fn ask(&mut self, message: &str) -> io::Result<String> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    pub fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let answer = self.ask(message)?;
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    /// Asks for strategy, limit and date range. Saving is confirmed later,
    /// once the operator has seen the messages.
    pub fn ask_run_options(&mut self) -> Result<RunOptions> {
        writeln!(self.output, "\n=== Retrieval method ===")?;
        writeln!(
            self.output,
            "1. Direct search (recommended): search.messages returns only this user's messages"
        )?;
        writeln!(
            self.output,
            "2. Full fetch then filter: read the whole channel history and filter locally"
        )?;
        let strategy = loop {
            match self.ask("Choose (1/2): ")?.as_str() {
                "1" => break Strategy::DirectSearch,
                "2" => break Strategy::FullFetch,
                "" => bail!("no retrieval method chosen"),
                other => writeln!(self.output, "Invalid choice: {other:?}")?,
            }
        };

        writeln!(self.output, "\n=== Options ===")?;
        let raw_limit = self.ask(&format!("Number of messages (default: {DEFAULT_LIMIT}): "))?;
        let limit = raw_limit.parse().unwrap_or(DEFAULT_LIMIT);

        writeln!(self.output, "\nDate range, e.g. 2025-04-01 (leave empty for none):")?;
        let since = self.ask_date("Start date: ")?;
        let until = self.ask_date("End date: ")?;

        Ok(RunOptions {
            strategy,
            limit: Some(limit),
            since,
            until,
            save: false,
        })
    }

    fn ask_date(&mut self, message: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        loop {
            let answer = self.ask(message)?;
            if answer.is_empty() {
                return Ok(None);
            }
            match parse_date_bound(&answer) {
                Ok(at) => return Ok(Some(at)),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }
}
