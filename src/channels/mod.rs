//! Chat Transport Seam
//!
//! Defines the interface between the poll service and whatever messaging
//! transport delivers commands to it. The transport itself (room membership,
//! message parsing, dispatch) lives outside this crate; commands arrive as a
//! sender identity plus a token list, and replies go back through an
//! object-safe reply capability.

use async_trait::async_trait;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur when talking back to the chat transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Transport not connected")]
    NotConnected,
}

/// A command extracted from an incoming chat message.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Chat identity of the sender (room-scoped user id)
    pub sender: String,
    /// Whitespace-split arguments after the command name
    pub args: Vec<String>,
}

impl CommandRequest {
    /// Create a request from a sender and pre-split arguments
    pub fn new(sender: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            sender: sender.into(),
            args,
        }
    }
}

/// Reply capability handed to a command handler for a single invocation.
///
/// Implementations send into the room/conversation the command arrived in.
#[async_trait]
pub trait ReplyContext: Send + Sync {
    /// Send a plain-text reply
    async fn reply(&self, text: &str) -> TransportResult<()>;

    /// Send a reply carrying HTML formatting (bold ids etc.)
    async fn reply_formatted(&self, html: &str) -> TransportResult<()>;
}

/// Registration metadata for a chat command.
///
/// Surfaced by a generic help command on the transport side.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Primary command name
    pub name: &'static str,
    /// Alternate names the transport may route to the same handler
    pub aliases: Vec<&'static str>,
    /// Multi-line usage text
    pub help: String,
}

/// Errors from quote-aware argument splitting
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArgSplitError {
    #[error("Unclosed quote in arguments")]
    UnclosedQuote,

    #[error("Trailing backslash in arguments")]
    TrailingEscape,
}

/// Split a raw argument string into tokens, honoring quotes.
///
/// Double and single quotes group whitespace into a single token; a
/// backslash escapes the next character outside single quotes. Empty quoted
/// strings produce empty tokens and are kept so callers can reject them
/// explicitly.
pub fn split_args(raw: &str) -> Result<Vec<String>, ArgSplitError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some('"') => match c {
                '"' => quote = None,
                '\\' => {
                    let escaped = chars.next().ok_or(ArgSplitError::TrailingEscape)?;
                    current.push(escaped);
                }
                _ => current.push(c),
            },
            _ => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => {
                    let escaped = chars.next().ok_or(ArgSplitError::TrailingEscape)?;
                    current.push(escaped);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(ArgSplitError::UnclosedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
