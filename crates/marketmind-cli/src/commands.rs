//! REPL command parsing

use anyhow::{Context, anyhow, bail};
use marketmind::Symbol;

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Edit the search query
    Search { query: String },
    /// Add the n-th search row (1-based) to the watchlist
    Add { index: usize },
    /// Open the detail view for a symbol
    Open { symbol: Symbol },
    /// Show the link of a detail row (both 1-based)
    Link { section: usize, row: usize },
    /// Show tracked symbols
    Watchlist,
    /// Close the detail view
    Close,
    /// Show help
    Help,
    /// Exit the REPL
    Exit,
}

fn position(arg: Option<&&str>, what: &str) -> anyhow::Result<usize> {
    let raw = arg.ok_or_else(|| anyhow!("Missing {what}"))?;
    let n: usize = raw
        .parse()
        .with_context(|| format!("Invalid {what}: {raw}"))?;
    if n == 0 {
        bail!("{what} starts at 1");
    }
    Ok(n)
}

impl Command {
    /// Parse a command; text without a leading `/` is a search query
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Empty input");
        }

        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Search {
                query: input.to_string(),
            });
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            bail!("Empty command");
        };

        match cmd.to_lowercase().as_str() {
            "search" | "s" => Ok(Command::Search {
                query: args.join(" "),
            }),
            "add" | "a" => Ok(Command::Add {
                index: position(args.first(), "row number")?,
            }),
            "open" | "o" => {
                let raw = args.first().ok_or_else(|| anyhow!("Missing symbol for open"))?;
                Ok(Command::Open {
                    symbol: Symbol::new(raw)?,
                })
            }
            "link" | "l" => Ok(Command::Link {
                section: position(args.first(), "section number")?,
                row: position(args.get(1), "row number")?,
            }),
            "watchlist" | "w" => Ok(Command::Watchlist),
            "close" | "c" => Ok(Command::Close),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            other => bail!("Unknown command: /{other}. Type /help for a list."),
        }
    }
}

pub fn help_text() -> &'static str {
    r"Commands:
  <text> | /search <text>   Search symbols (/search alone cancels and keeps the list)
  /add <n>                  Add search row n to the watchlist
  /open <symbol>            Open the detail view
  /link <section> <row>     Show the link behind a detail row
  /watchlist                List tracked symbols
  /close                    Close the detail view
  /help                     Show this help
  /exit                     Quit"
}
