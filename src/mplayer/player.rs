//! High-level MPlayer player with discovered property accessors.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{ChildStdin, ChildStdout};

use super::accessor::{AccessError, Accessor, AccessorTable, Getter};
use super::channel::{ChannelError, CommandChannel};
use super::discovery::{discover, DiscoveryPolicy, PropertyDescriptor};
use super::process::{resolve_mplayer, spawn_mplayer, PlayerProcess, ProcessError};
use super::protocol::PendingCommand;
use super::types::{PropertyType, PropertyValue};
use crate::config::PlayerConfig;

#[derive(Error, Debug)]
pub enum PlayerError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),
  #[error("Channel error: {0}")]
  Channel(#[from] ChannelError),
  #[error(transparent)]
  Access(#[from] AccessError),
  #[error("Not a valid file path: {}", .0.display())]
  InvalidPath(PathBuf),
  #[error("Unknown property: {0}")]
  UnknownProperty(String),
  #[error("Property is read-only: {0}")]
  ReadOnly(String),
}

/// MPlayer driven over its slave-mode stdin/stdout.
///
/// Every operation that talks to MPlayer takes `&mut self`: one command is in flight at
/// a time. Share a player between tasks behind a mutex.
pub struct Player<R = ChildStdout, W = ChildStdin> {
  channel: CommandChannel<R, W>,
  accessors: AccessorTable,
  pause: Getter,
  process: Option<PlayerProcess>,
}

impl Player {
  /// Discover MPlayer's properties, then start it in slave mode.
  pub async fn launch(config: &PlayerConfig) -> Result<Self, PlayerError> {
    Self::launch_with_policy(config, &DiscoveryPolicy::default()).await
  }

  pub async fn launch_with_policy(
    config: &PlayerConfig,
    policy: &DiscoveryPolicy,
  ) -> Result<Self, PlayerError> {
    let program = resolve_mplayer(config.mplayer_path().as_deref())?;
    let descriptors = discover(&program, policy).await?;

    let (process, stdout, stdin) = spawn_mplayer(&program, &config.mplayer_args)?;
    let channel = CommandChannel::new(stdout, stdin)
      .with_timeouts(config.reply_timeout(), config.load_timeout());

    let mut player = Self::with_channel(channel, descriptors);
    log::info!(
      "MPlayer started (pid: {:?}) with {} properties",
      process.pid(),
      player.accessors.len()
    );
    player.process = Some(process);
    Ok(player)
  }
}

impl<R, W> Player<R, W>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  /// Build a player over an existing channel. No process is owned.
  pub fn with_channel(
    channel: CommandChannel<R, W>,
    descriptors: impl IntoIterator<Item = PropertyDescriptor>,
  ) -> Self {
    Self {
      channel,
      accessors: AccessorTable::build(descriptors),
      pause: Getter::new("pause", PropertyType::Flag),
      process: None,
    }
  }

  /// Discovered properties, in discovery order.
  pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
    self.accessors.iter().map(Accessor::descriptor)
  }

  pub fn accessor(&self, alias: &str) -> Option<&Accessor> {
    self.accessors.get(alias)
  }

  /// Read a property by alias. `Ok(None)` means MPlayer has no value for it right now.
  pub async fn get(&mut self, alias: &str) -> Result<Option<PropertyValue>, PlayerError> {
    let accessor = self
      .accessors
      .get(alias)
      .ok_or_else(|| PlayerError::UnknownProperty(alias.to_string()))?;
    Ok(accessor.getter().read(&mut self.channel).await?)
  }

  /// Write a property by alias. Validation failures never reach MPlayer.
  pub async fn set(
    &mut self,
    alias: &str,
    value: impl Into<PropertyValue>,
  ) -> Result<(), PlayerError> {
    let value = value.into();
    let accessor = self
      .accessors
      .get(alias)
      .ok_or_else(|| PlayerError::UnknownProperty(alias.to_string()))?;
    let setter = accessor
      .setter()
      .ok_or_else(|| PlayerError::ReadOnly(alias.to_string()))?;
    setter.write(&mut self.channel, &value).await?;
    Ok(())
  }

  /// Load a file and wait until playback starts.
  pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PlayerError> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(PlayerError::InvalidPath(path.to_path_buf()));
    }

    log::info!("Loading file: {}", path.display());
    let reply = self
      .channel
      .send(&PendingCommand::loadfile(&path.to_string_lossy()))
      .await?;
    log::debug!("Load completed with {:?}", reply);
    Ok(())
  }

  /// Current pause state.
  pub async fn paused(&mut self) -> Result<bool, PlayerError> {
    let value = self.pause.read(&mut self.channel).await?;
    Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
  }

  /// Set pause state. The state is always queried; the toggle is only sent on a change.
  pub async fn set_paused(&mut self, paused: bool) -> Result<(), PlayerError> {
    if self.paused().await? != paused {
      self.channel.send(&PendingCommand::pause()).await?;
    }
    Ok(())
  }

  pub async fn pause(&mut self) -> Result<(), PlayerError> {
    self.set_paused(true).await
  }

  pub async fn resume(&mut self) -> Result<(), PlayerError> {
    self.set_paused(false).await
  }

  /// Flip pause state without querying it.
  pub async fn toggle_pause(&mut self) -> Result<(), PlayerError> {
    self.channel.send(&PendingCommand::pause()).await?;
    Ok(())
  }

  /// Stop playback; MPlayer stays idle.
  pub async fn stop(&mut self) -> Result<(), PlayerError> {
    self.channel.send(&PendingCommand::stop()).await?;
    Ok(())
  }

  /// Ask MPlayer to exit, then kill it.
  pub async fn quit(&mut self) -> Result<(), PlayerError> {
    if let Err(e) = self.channel.send(&PendingCommand::quit()).await {
      log::warn!("quit command failed: {}", e);
    }
    self.terminate();
    Ok(())
  }

  /// Kill the owned MPlayer process, if any. Dropping the player does the same.
  pub fn terminate(&mut self) {
    match self.process.take() {
      Some(mut process) => process.kill(),
      None => log::debug!("No MPlayer process to terminate"),
    }
  }

  /// Whether an owned MPlayer process is still running.
  pub fn is_running(&mut self) -> bool {
    match self.process.as_mut() {
      Some(process) => !process.has_exited(),
      None => false,
    }
  }
}
