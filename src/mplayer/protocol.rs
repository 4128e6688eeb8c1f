//! MPlayer slave-mode line protocol.
//!
//! Reference: http://www.mplayerhq.hu/DOCS/tech/slave.txt

/// Prefix of every answer line (`ANS_volume=50.000000`).
pub const REPLY_PREFIX: &str = "ANS";
/// Answer value for a property that currently has no value.
pub const PROPERTY_UNAVAILABLE: &str = "PROPERTY_UNAVAILABLE";
/// Status line that completes a `loadfile` command.
pub const PLAYBACK_STARTED: &str = "Starting playback";

/// What completes a command that expects a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
  /// An `ANS` line.
  Answer,
  /// The playback-start status line (or an `ANS` line).
  PlaybackStart,
}

/// Command written to MPlayer's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
  pub line: String,
  pub expect_reply: bool,
  pub completion: Completion,
}

impl PendingCommand {
  /// Build a command from a literal line. Lines starting with `loadfile` complete on
  /// playback start.
  pub fn raw(line: impl Into<String>, expect_reply: bool) -> Self {
    let line = line.into();
    let completion = if line.starts_with("loadfile") {
      Completion::PlaybackStart
    } else {
      Completion::Answer
    };
    Self {
      line,
      expect_reply,
      completion,
    }
  }

  /// Read a property.
  pub fn get_property(name: &str) -> Self {
    Self::raw(format!("get_property {}", name), true)
  }

  /// Write a property. MPlayer does not always acknowledge sets, so no reply is awaited.
  pub fn set_property(name: &str, value: &str) -> Self {
    Self::raw(format!("set_property {} {}", name, value), false)
  }

  /// Load a file and wait for playback to start.
  pub fn loadfile(path: &str) -> Self {
    Self::raw(format!("loadfile \"{}\"", quote_escape(path)), true)
  }

  /// Toggle pause.
  pub fn pause() -> Self {
    Self::raw("pause", false)
  }

  /// Stop playback, keeping the process idle.
  pub fn stop() -> Self {
    Self::raw("stop", false)
  }

  /// Ask MPlayer to exit.
  pub fn quit() -> Self {
    Self::raw("quit", false)
  }

  pub fn is_load(&self) -> bool {
    self.completion == Completion::PlaybackStart
  }
}

/// Backslash-escape `\` and `"` for MPlayer's quoted arguments.
fn quote_escape(arg: &str) -> String {
  let mut escaped = String::with_capacity(arg.len());
  for c in arg.chars() {
    if c == '\\' || c == '"' {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

/// Classification of one output line relative to the outstanding command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine {
  /// Answer text with quotes stripped.
  Answer(String),
  /// Answer carrying the unavailable token.
  Unavailable,
  /// Playback started (load-style commands only).
  PlaybackStarted,
  /// Anything else: status chatter, warnings, answers to nothing.
  Other,
}

impl ReplyLine {
  /// Classify a raw output line for a command with the given completion.
  pub fn parse(line: &str, completion: Completion) -> Self {
    let line = line.trim();

    if completion == Completion::PlaybackStart && line.starts_with(PLAYBACK_STARTED) {
      return ReplyLine::PlaybackStarted;
    }

    if line.starts_with(REPLY_PREFIX) {
      let value = line
        .split_once('=')
        .map(|(_, value)| value)
        .unwrap_or("")
        .trim_matches(|c| c == '\'' || c == '"');
      if value == PROPERTY_UNAVAILABLE {
        return ReplyLine::Unavailable;
      }
      return ReplyLine::Answer(value.to_string());
    }

    ReplyLine::Other
  }
}
