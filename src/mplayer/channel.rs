//! Serialized command channel over MPlayer's stdin/stdout.
//!
//! MPlayer answers carry no request id, so correlation relies on there being at most one
//! outstanding command: the first qualifying line after a write is that command's reply.
//! `send` takes `&mut self`, which is what enforces this.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::protocol::{Completion, PendingCommand, ReplyLine};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ChannelError {
  #[error("I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("MPlayer output closed")]
  Closed,
  #[error("No reply to {command:?} within {timeout:?}")]
  Timeout { command: String, timeout: Duration },
}

/// Result of a successful `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  /// Written without waiting for a reply.
  Sent,
  /// Raw answer text.
  Answer(String),
  /// The property has no value right now.
  Unavailable,
  /// A load-style command saw playback start.
  PlaybackStarted,
}

impl Reply {
  /// Answer text, if any. `Unavailable` maps to `None`.
  pub fn into_answer(self) -> Option<String> {
    match self {
      Reply::Answer(text) => Some(text),
      _ => None,
    }
  }
}

/// One-command-at-a-time channel to an MPlayer process.
pub struct CommandChannel<R, W> {
  reader: BufReader<R>,
  writer: W,
  /// Bytes of the line currently being read; survives a timed-out read.
  line_buf: Vec<u8>,
  reply_timeout: Option<Duration>,
  load_timeout: Option<Duration>,
  closed: bool,
}

impl<R, W> CommandChannel<R, W>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  /// Wrap an output stream and an input stream with the default timeouts.
  pub fn new(reader: R, writer: W) -> Self {
    Self {
      reader: BufReader::new(reader),
      writer,
      line_buf: Vec::new(),
      reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
      load_timeout: Some(DEFAULT_LOAD_TIMEOUT),
      closed: false,
    }
  }

  /// Override the timeouts. `None` waits forever.
  pub fn with_timeouts(mut self, reply: Option<Duration>, load: Option<Duration>) -> Self {
    self.reply_timeout = reply;
    self.load_timeout = load;
    self
  }

  /// Whether MPlayer's output has reached EOF or its input can no longer be written.
  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Write a command and, if it expects one, wait for its reply.
  pub async fn send(&mut self, cmd: &PendingCommand) -> Result<Reply, ChannelError> {
    if self.closed {
      return Err(ChannelError::Closed);
    }

    log::debug!("Sending MPlayer command: {}", cmd.line);
    if let Err(e) = self.write_line(&cmd.line).await {
      // MPlayer's stdin is gone, no later command can reach it
      log::error!("Failed to write MPlayer command {:?}: {}", cmd.line, e);
      self.closed = true;
      return Err(e.into());
    }

    if !cmd.expect_reply {
      return Ok(Reply::Sent);
    }

    let limit = if cmd.is_load() {
      self.load_timeout
    } else {
      self.reply_timeout
    };

    let reply = match limit {
      Some(limit) => match tokio::time::timeout(limit, self.await_reply(cmd.completion)).await {
        Ok(result) => result?,
        Err(_) => {
          log::error!("MPlayer command timeout after {:?}: {}", limit, cmd.line);
          return Err(ChannelError::Timeout {
            command: cmd.line.clone(),
            timeout: limit,
          });
        }
      },
      None => self.await_reply(cmd.completion).await?,
    };

    log::debug!("MPlayer reply to {:?}: {:?}", cmd.line, reply);
    Ok(reply)
  }

  async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
    self.writer.write_all(line.as_bytes()).await?;
    self.writer.write_all(b"\n").await?;
    self.writer.flush().await
  }

  async fn await_reply(&mut self, completion: Completion) -> Result<Reply, ChannelError> {
    loop {
      let Some(line) = self.next_line().await? else {
        log::info!("MPlayer output closed while waiting for a reply");
        self.closed = true;
        return Err(ChannelError::Closed);
      };

      match ReplyLine::parse(&line, completion) {
        ReplyLine::Answer(text) => return Ok(Reply::Answer(text)),
        ReplyLine::Unavailable => return Ok(Reply::Unavailable),
        ReplyLine::PlaybackStarted => return Ok(Reply::PlaybackStarted),
        ReplyLine::Other => log::trace!("MPlayer: {}", line),
      }
    }
  }

  /// Next output line, decoded lossily since MPlayer echoes file names and tags verbatim.
  /// `read_until` appends to `line_buf`, so a read cut short by a timeout resumes
  /// where it stopped.
  async fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
    let read = self.reader.read_until(b'\n', &mut self.line_buf).await?;
    if read == 0 && self.line_buf.is_empty() {
      return Ok(None);
    }
    let line = String::from_utf8_lossy(&self.line_buf)
      .trim_end_matches(|c| c == '\r' || c == '\n')
      .to_string();
    self.line_buf.clear();
    Ok(Some(line))
  }
}
