//! User action parsing
//!
//! Parses input lines like `/cd 0 "/home/user/My Music"` into
//! [`UserAction`] values for the session controller.

/// Parsed user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Append a path slot, optionally with a directory
    AddSlot(Option<String>),
    /// Remove the last path slot
    RemoveSlot,
    /// Request a directory listing for a slot
    List(usize),
    /// Choose a directory for a slot
    Choose(usize, String),
    /// Confirm the selection and start scanning
    Start,
    /// Show the peer roster
    Peers,
    /// End the session
    Quit,
    /// Unknown command name
    Unknown(String),
}

/// Error parsing an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Empty input
    Empty,
    /// Missing slot number
    MissingSlot,
    /// Slot is not a number
    InvalidSlot(String),
    /// Missing directory argument
    MissingDirectory,
    /// Invalid syntax
    InvalidSyntax(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::MissingSlot => write!(f, "missing slot number"),
            ParseError::InvalidSlot(s) => write!(f, "invalid slot number '{}'", s),
            ParseError::MissingDirectory => write!(f, "missing directory"),
            ParseError::InvalidSyntax(msg) => write!(f, "invalid syntax: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse an input line into a UserAction
///
/// # Supported commands
///
/// - `/add [dir]` - add a path slot
/// - `/remove` - remove the last path slot
/// - `/ls <nr>` - list directories for slot `nr`
/// - `/cd <nr> <dir>` - choose a directory, `dir` may be quoted
/// - `/start` - confirm the selection
/// - `/peers` - print the roster
/// - `/quit` - close the session
///
/// # Examples
///
/// ```
/// use adbf_client::commands::{parse_action, UserAction};
///
/// assert_eq!(parse_action("/ls 0").unwrap(), UserAction::List(0));
/// assert_eq!(
///     parse_action("/cd 1 \"/srv/My Music\"").unwrap(),
///     UserAction::Choose(1, "/srv/My Music".into())
/// );
/// ```
pub fn parse_action(input: &str) -> Result<UserAction, ParseError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let Some(body) = input.strip_prefix('/') else {
        return Err(ParseError::InvalidSyntax(
            "command must start with /".to_string(),
        ));
    };

    let (name, args) = split_first_token(body);
    let name = name.to_lowercase();
    let args = args.trim();

    match name.as_str() {
        "add" => {
            if args.is_empty() {
                Ok(UserAction::AddSlot(None))
            } else {
                Ok(UserAction::AddSlot(Some(parse_directory(args)?)))
            }
        }
        "remove" | "rm" => Ok(UserAction::RemoveSlot),
        "ls" => {
            let (slot, _) = split_first_token(args);
            Ok(UserAction::List(parse_slot(slot)?))
        }
        "cd" => {
            let (slot, rest) = split_first_token(args);
            let slot = parse_slot(slot)?;
            let rest = rest.trim();
            if rest.is_empty() {
                return Err(ParseError::MissingDirectory);
            }
            Ok(UserAction::Choose(slot, parse_directory(rest)?))
        }
        "start" => Ok(UserAction::Start),
        "peers" => Ok(UserAction::Peers),
        "quit" | "q" => Ok(UserAction::Quit),
        _ => Ok(UserAction::Unknown(name)),
    }
}

fn parse_slot(token: &str) -> Result<usize, ParseError> {
    if token.is_empty() {
        return Err(ParseError::MissingSlot);
    }
    token
        .parse()
        .map_err(|_| ParseError::InvalidSlot(token.to_string()))
}

/// Parse a directory argument (handles quoted and unquoted)
fn parse_directory(input: &str) -> Result<String, ParseError> {
    let input = input.trim();

    for quote in ['"', '\''] {
        if let Some(stripped) = input.strip_prefix(quote) {
            return match stripped.find(quote) {
                Some(end) => Ok(stripped[..end].to_string()),
                None => Err(ParseError::InvalidSyntax(
                    "unclosed quote in directory".to_string(),
                )),
            };
        }
    }

    // Unquoted - take the rest of the line
    Ok(input.to_string())
}

/// Split the first whitespace-delimited token from a string
fn split_first_token(input: &str) -> (&str, &str) {
    if let Some(pos) = input.find(char::is_whitespace) {
        (&input[..pos], &input[pos..])
    } else {
        (input, "")
    }
}

/// Check if input looks like a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}
