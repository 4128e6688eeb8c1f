//! MPlayer binary detection and process spawning.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::exit_hook;

/// Slave mode, idle when nothing is loaded, minimal status chatter.
pub const BASE_ARGS: [&str; 3] = ["-slave", "-idle", "-quiet"];
/// Flag that makes MPlayer print its property table and exit.
pub const LIST_PROPERTIES_ARG: &str = "-list-properties";

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("MPlayer executable not found")]
  NotFound,
  #[error("Failed to spawn MPlayer: {0}")]
  SpawnFailed(#[from] std::io::Error),
  #[error("MPlayer {0} pipe not available")]
  MissingPipe(&'static str),
  #[error("MPlayer property listing failed: {0}")]
  ListingFailed(String),
}

/// Install locations searched when `mplayer` is not on `PATH`.
#[cfg(windows)]
const INSTALL_DIRS: &[&str] = &[
  r"C:\Program Files\MPlayer",
  r"C:\Program Files (x86)\MPlayer",
  r"C:\mplayer",
];
#[cfg(target_os = "macos")]
const INSTALL_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/opt/local/bin"];
#[cfg(not(any(windows, target_os = "macos")))]
const INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/usr/games"];

#[cfg(windows)]
const EXECUTABLE: &str = "mplayer.exe";
#[cfg(not(windows))]
const EXECUTABLE: &str = "mplayer";

/// Locate MPlayer on `PATH`, then in the platform's usual install directories.
pub fn find_mplayer() -> Option<PathBuf> {
  which::which("mplayer")
    .ok()
    .or_else(|| find_in_dirs(INSTALL_DIRS.iter().map(Path::new)))
}

/// First directory in `dirs` that holds an MPlayer executable.
fn find_in_dirs<'a>(dirs: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
  dirs
    .into_iter()
    .map(|dir| dir.join(EXECUTABLE))
    .find(|candidate| candidate.is_file())
}

/// Resolve the configured executable, falling back to detection.
pub fn resolve_mplayer(configured: Option<&Path>) -> Result<PathBuf, ProcessError> {
  configured
    .map(Path::to_path_buf)
    .or_else(find_mplayer)
    .ok_or(ProcessError::NotFound)
}

/// Run `<program> -list-properties` to completion and return its stdout.
pub async fn list_properties(program: &Path) -> Result<String, ProcessError> {
  log::info!("Listing MPlayer properties: {:?}", program);

  let output = Command::new(program)
    .arg(LIST_PROPERTIES_ARG)
    .stdin(Stdio::null())
    .stderr(Stdio::null())
    .output()
    .await?;

  if output.stdout.is_empty() {
    return Err(ProcessError::ListingFailed(format!(
      "no output, exit status {}",
      output.status
    )));
  }

  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A running MPlayer. The child is killed when this is dropped.
#[derive(Debug)]
pub struct PlayerProcess {
  child: Child,
  pid: Option<u32>,
  killed: bool,
}

impl PlayerProcess {
  pub fn pid(&self) -> Option<u32> {
    self.pid
  }

  /// Kill the child and deregister it from the exit hook.
  pub fn kill(&mut self) {
    if self.killed {
      return;
    }
    self.killed = true;

    if let Some(pid) = self.pid {
      exit_hook::forget(pid);
      log::info!("Killing MPlayer process (pid: {})", pid);
    }
    match self.child.start_kill() {
      Ok(_) => log::debug!("kill() succeeded"),
      // already reaped
      Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {}
      Err(e) => log::error!("kill() failed: {}", e),
    }
  }

  /// Whether the child has exited.
  pub fn has_exited(&mut self) -> bool {
    matches!(self.child.try_wait(), Ok(Some(_)))
  }
}

impl Drop for PlayerProcess {
  fn drop(&mut self) {
    self.kill();
  }
}

/// Spawn MPlayer in slave mode with piped stdin/stdout.
pub fn spawn_mplayer(
  program: &Path,
  extra_args: &[String],
) -> Result<(PlayerProcess, ChildStdout, ChildStdin), ProcessError> {
  log::info!("Spawning MPlayer: {:?}", program);
  if !extra_args.is_empty() {
    log::info!("Extra MPlayer args: {:?}", extra_args);
  }

  let mut cmd = Command::new(program);
  cmd.args(BASE_ARGS);

  // Add user-specified extra arguments
  for arg in extra_args {
    cmd.arg(arg);
  }

  let mut child = cmd
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .kill_on_drop(true)
    .spawn()?;

  let pid = child.id();
  if let Some(pid) = pid {
    exit_hook::register(pid);
  }

  let stdout = child.stdout.take();
  let stdin = child.stdin.take();
  // dropping the process kills the child on the error paths below
  let process = PlayerProcess {
    child,
    pid,
    killed: false,
  };

  let stdout = stdout.ok_or(ProcessError::MissingPipe("stdout"))?;
  let stdin = stdin.ok_or(ProcessError::MissingPipe("stdin"))?;

  Ok((process, stdout, stdin))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_configured_path_wins() {
    let path = PathBuf::from("/opt/custom/mplayer");
    assert_eq!(resolve_mplayer(Some(path.as_path())).unwrap(), path);
  }

  #[test]
  fn test_install_dirs_are_searched_in_order() {
    let first = tempfile::TempDir::new().unwrap();
    let second = tempfile::TempDir::new().unwrap();
    let third = tempfile::TempDir::new().unwrap();
    std::fs::write(second.path().join(EXECUTABLE), b"").unwrap();
    std::fs::write(third.path().join(EXECUTABLE), b"").unwrap();
    // a directory with the executable's name is not a match
    std::fs::create_dir(first.path().join(EXECUTABLE)).unwrap();

    let found = find_in_dirs([first.path(), second.path(), third.path()]);
    assert_eq!(found, Some(second.path().join(EXECUTABLE)));
    assert_eq!(find_in_dirs([first.path()]), None);
  }

  #[tokio::test]
  async fn test_listing_missing_binary_fails() {
    let err = list_properties(Path::new("/nonexistent/mplayer")).await.unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailed(_)));
  }

  #[tokio::test]
  async fn test_spawn_missing_binary_fails() {
    let err = spawn_mplayer(Path::new("/nonexistent/mplayer"), &[]).unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailed(_)));
  }
}
