//! Process-exit fallback for MPlayer children.
//!
//! `PlayerProcess` kills its child on drop, but `std::process::exit` skips destructors.
//! Children registered here are killed from an `atexit` handler in that case.

use parking_lot::{const_mutex, Mutex};

static LIVE_CHILDREN: Mutex<Vec<u32>> = const_mutex(Vec::new());

/// Track a spawned child until it is killed.
pub fn register(pid: u32) {
  install();
  LIVE_CHILDREN.lock().push(pid);
}

/// Stop tracking a child that has been killed through its handle.
pub fn forget(pid: u32) {
  LIVE_CHILDREN.lock().retain(|&live| live != pid);
}

/// Children still tracked.
#[cfg(test)]
pub fn live_children() -> Vec<u32> {
  LIVE_CHILDREN.lock().clone()
}

#[cfg(unix)]
fn install() {
  use std::sync::Once;

  static INSTALL: Once = Once::new();
  INSTALL.call_once(|| {
    // SAFETY: the handler only touches the registry and sends signals.
    let rc = unsafe { libc::atexit(kill_live_children) };
    if rc != 0 {
      log::warn!("Failed to register MPlayer exit hook");
    }
  });
}

#[cfg(not(unix))]
fn install() {}

#[cfg(unix)]
extern "C" fn kill_live_children() {
  // a thread may still hold the lock while the process exits
  let Some(mut live) = LIVE_CHILDREN.try_lock() else {
    return;
  };
  for pid in live.drain(..) {
    // SAFETY: plain kill(2) on a pid we spawned.
    unsafe {
      libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_register_and_forget() {
    // pids far above any real pid_max
    register(4_000_001);
    register(4_000_002);
    assert!(live_children().contains(&4_000_001));

    forget(4_000_001);
    let live = live_children();
    assert!(!live.contains(&4_000_001));
    assert!(live.contains(&4_000_002));

    forget(4_000_002);
  }
}
