//! Outgoing command word lists.

use std::fmt;

/// Prefix of the commands that bypass session gating.
pub const LOGIN_PREFIX: &str = "login.";

/// A command name followed by its arguments, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            words: vec![name.into()],
        }
    }

    /// Wrap an already structured word list; the first word is the command name.
    pub fn from_words(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.words.push(arg.to_string());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToString,
    {
        self.words.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or_default()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }

    /// Login commands are never queued.
    pub fn is_login(&self) -> bool {
        self.name().starts_with(LOGIN_PREFIX)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Command::new(name)
    }
}
