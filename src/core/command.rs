//! Command parser for the : command system

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Queries
    Query(String),
    Batch(String),
    Refresh,
    Mode,

    // Selection
    Chain(String),
    Clear,
    Search(Option<String>),

    // History
    Forget(String),
    Recall(usize),
    Copy(Option<usize>),
    ClearHistory,

    Quit,

    // Unknown command
    Unknown(String),
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    match cmd.to_lowercase().as_str() {
        "query" | "q" | "address" | "addr" => match args {
            Some(addr) => Command::Query(addr),
            None => Command::Unknown(input.to_string()),
        },
        "batch" | "b" => match args {
            Some(list) => Command::Batch(list),
            None => Command::Unknown(input.to_string()),
        },
        "refresh" | "r" => Command::Refresh,
        "mode" => Command::Mode,

        "chain" | "network" | "net" => match args {
            Some(key) => Command::Chain(key),
            None => Command::Unknown(input.to_string()),
        },
        "clear" | "none" => Command::Clear,
        "search" | "find" => Command::Search(args),

        "forget" | "rm" => match args {
            Some(addr) => Command::Forget(addr),
            None => Command::Unknown(input.to_string()),
        },
        "recall" => match args.and_then(|s| s.parse::<usize>().ok()) {
            Some(n) if n > 0 => Command::Recall(n - 1),
            _ => Command::Unknown(input.to_string()),
        },
        "copy" | "yank" => Command::Copy(
            args.and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(|n| n - 1),
        ),
        "clear-history" | "purge" => Command::ClearHistory,

        "quit" | "exit" => Command::Quit,

        _ => Command::Unknown(input.to_string()),
    }
}
