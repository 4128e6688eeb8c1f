//! Line console over a running player.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::PlayerConfig;
use crate::mplayer::{Player, PropertyValue};

const HELP: &str = "\
props                 list properties
get <property>        read a property
set <property> <v>    write a property
load <path>           load a file and wait for playback
pause | resume        set pause state
toggle                flip pause state
stop                  stop playback
dump                  all readable properties as JSON
quit                  exit";

/// One console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
  Props,
  Get(String),
  Set(String, String),
  Load(PathBuf),
  Pause,
  Resume,
  Toggle,
  Stop,
  Dump,
  Help,
  Quit,
}

impl ConsoleCommand {
  /// Parse a console line. Blank lines give `Ok(None)`.
  pub fn parse(line: &str) -> Result<Option<Self>, String> {
    let line = line.trim();
    if line.is_empty() {
      return Ok(None);
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match (word, rest) {
      ("props", "") => ConsoleCommand::Props,
      ("get", name) if !name.is_empty() && !name.contains(' ') => {
        ConsoleCommand::Get(name.to_string())
      }
      ("set", args) => match args.split_once(char::is_whitespace) {
        Some((name, value)) => ConsoleCommand::Set(name.to_string(), value.trim().to_string()),
        None => return Err("usage: set <property> <value>".to_string()),
      },
      ("load", path) if !path.is_empty() => {
        ConsoleCommand::Load(PathBuf::from(path.trim_matches('"')))
      }
      ("pause", "") => ConsoleCommand::Pause,
      ("resume", "") => ConsoleCommand::Resume,
      ("toggle", "") => ConsoleCommand::Toggle,
      ("stop", "") => ConsoleCommand::Stop,
      ("dump", "") => ConsoleCommand::Dump,
      ("help", "") => ConsoleCommand::Help,
      ("quit", "") | ("exit", "") => ConsoleCommand::Quit,
      _ => return Err(format!("unknown command: {} (try help)", line)),
    };
    Ok(Some(command))
  }
}

/// Run one command and return the text to print.
pub async fn execute<R, W>(player: &mut Player<R, W>, command: &ConsoleCommand) -> Result<String, String>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  match command {
    ConsoleCommand::Props => Ok(
      player
        .properties()
        .map(|d| {
          let access = if d.read_only { "ro" } else { "rw" };
          let bound = |b: &Option<PropertyValue>| b.as_ref().map_or("-".to_string(), |v| v.to_string());
          format!("{:<20} {:<12} {:>8} {:>8} {}", d.alias, d.kind, bound(&d.min), bound(&d.max), access)
        })
        .collect::<Vec<_>>()
        .join("\n"),
    ),
    ConsoleCommand::Get(alias) => match player.get(alias).await.map_err(|e| e.to_string())? {
      Some(value) => Ok(value.to_string()),
      None => Ok("(unavailable)".to_string()),
    },
    ConsoleCommand::Set(alias, text) => {
      let kind = player
        .accessor(alias)
        .map(|a| a.descriptor().kind)
        .ok_or_else(|| format!("Unknown property: {}", alias))?;
      let value = kind.cast()(text.as_str()).map_err(|e| e.to_string())?;
      player.set(alias, value).await.map_err(|e| e.to_string())?;
      Ok(String::new())
    }
    ConsoleCommand::Load(path) => {
      player.load(path).await.map_err(|e| e.to_string())?;
      Ok(format!("Playing {}", path.display()))
    }
    ConsoleCommand::Pause => {
      player.pause().await.map_err(|e| e.to_string())?;
      Ok(String::new())
    }
    ConsoleCommand::Resume => {
      player.resume().await.map_err(|e| e.to_string())?;
      Ok(String::new())
    }
    ConsoleCommand::Toggle => {
      player.toggle_pause().await.map_err(|e| e.to_string())?;
      Ok(String::new())
    }
    ConsoleCommand::Stop => {
      player.stop().await.map_err(|e| e.to_string())?;
      Ok(String::new())
    }
    ConsoleCommand::Dump => {
      let aliases: Vec<String> = player.properties().map(|d| d.alias.clone()).collect();
      let mut values = Map::new();
      for alias in aliases {
        let value = player.get(&alias).await.map_err(|e| e.to_string())?;
        values.insert(
          alias,
          serde_json::to_value(value).map_err(|e| e.to_string())?,
        );
      }
      serde_json::to_string_pretty(&Value::Object(values)).map_err(|e| e.to_string())
    }
    ConsoleCommand::Help => Ok(HELP.to_string()),
    ConsoleCommand::Quit => Ok(String::new()),
  }
}

/// Read commands from `input` until `quit` or EOF, writing results to `output`.
pub async fn run_console<R, W, I, O>(
  player: &mut Player<R, W>,
  input: I,
  mut output: O,
) -> std::io::Result<()>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
  I: AsyncBufRead + Unpin,
  O: AsyncWrite + Unpin,
{
  let mut lines = input.lines();

  while let Some(line) = lines.next_line().await? {
    let command = match ConsoleCommand::parse(&line) {
      Ok(Some(command)) => command,
      Ok(None) => continue,
      Err(e) => {
        output.write_all(format!("error: {}\n", e).as_bytes()).await?;
        output.flush().await?;
        continue;
      }
    };

    if command == ConsoleCommand::Quit {
      break;
    }

    let text = match execute(player, &command).await {
      Ok(text) => text,
      Err(e) => {
        log::warn!("Console command {:?} failed: {}", command, e);
        format!("error: {}", e)
      }
    };
    if !text.is_empty() {
      output.write_all(text.as_bytes()).await?;
      output.write_all(b"\n").await?;
    }
    output.flush().await?;
  }

  Ok(())
}

/// Launch MPlayer from the saved config, optionally load `args[0]`, then serve the
/// console on stdin/stdout.
pub async fn start(args: Vec<String>) -> Result<(), String> {
  let config = PlayerConfig::load().map_err(|e| e.to_string())?;
  let mut player = Player::launch(&config).await.map_err(|e| e.to_string())?;

  if let Some(file) = args.first() {
    player.load(file).await.map_err(|e| e.to_string())?;
  }

  let stdin = tokio::io::BufReader::new(tokio::io::stdin());
  let result = run_console(&mut player, stdin, tokio::io::stdout()).await;

  player.quit().await.map_err(|e| e.to_string())?;
  result.map_err(|e| e.to_string())
}
