//! Terminal command-line parsing.
//!
//! A line is either empty, plain text (ignored), or a slash command of the
//! form `/<cmd>[ <arg> <arg> ...]`. The first whitespace character splits
//! the command from its tail; the tail is then split on single spaces, so a
//! run of spaces yields empty arguments and joining the arguments with `" "`
//! reproduces the tail exactly.
//!
//! Built-in names are matched case-insensitively; arguments keep their case.

/// Parsed terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing but whitespace.
    Empty,
    /// Text not starting with `/`.
    Text(String),
    /// Slash command.
    Command(CommandLine),
}

/// A slash command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Command name, case-folded.
    pub name: String,
    /// Arguments split on single spaces.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Arguments re-joined with single spaces (the raw tail).
    #[must_use]
    pub fn tail(&self) -> String {
        self.args.join(" ")
    }
}

/// Parse one already-trimmed line.
#[must_use]
pub fn parse_line(line: &str) -> Line {
    if line.is_empty() {
        return Line::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Line::Text(line.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, tail)) => (name, tail.split(' ').map(str::to_string).collect()),
        None => (rest, Vec::new()),
    };

    Line::Command(CommandLine {
        name: name.to_lowercase(),
        args,
    })
}

/// Commands understood by the client itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `/send <json>` (`/s`): transmit raw JSON text.
    Send,
    /// `/history <pos> [-p]` (`/h`): show a logged frame.
    History,
    /// `/test`: issue the sample user query.
    Test,
    /// `/quit` (`/q`): leave after a short delay.
    Quit,
    /// `/help`: list commands.
    Help,
}

impl Builtin {
    /// All built-ins in help order.
    pub const ALL: [Self; 5] = [Self::Send, Self::History, Self::Test, Self::Quit, Self::Help];

    /// Match a case-folded command name or alias.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "send" | "s" => Some(Self::Send),
            "history" | "h" => Some(Self::History),
            "test" => Some(Self::Test),
            "quit" | "q" => Some(Self::Quit),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// One-line usage text.
    #[must_use]
    pub fn usage(self) -> &'static str {
        match self {
            Self::Send => "/send <json>       (/s) send raw JSON to the server",
            Self::History => "/history <n> [-p]  (/h) show received message n (-p: pretty)",
            Self::Test => "/test              search users named 'riot'",
            Self::Quit => "/quit              (/q) disconnect and exit",
            Self::Help => "/help              show this list",
        }
    }
}
