//! MPlayer slave-mode module - spawns and controls an external MPlayer over stdin/stdout.
//!
//! Architecture:
//! - `types.rs` - property types, typed values and casts
//! - `protocol.rs` - command lines and reply-line classification
//! - `channel.rs` - one-command-at-a-time channel with reply correlation and timeouts
//! - `discovery.rs` - `-list-properties` parsing and naming policy
//! - `accessor.rs` - per-property getters and bounds-checked setters
//! - `process.rs` - MPlayer binary detection and process spawning
//! - `exit_hook.rs` - kills children left running when the host exits
//! - `player.rs` - high-level player

mod accessor;
mod channel;
mod discovery;
mod exit_hook;
mod player;
mod process;
mod protocol;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::{AccessError, Accessor, AccessorTable, Bound, Getter, Setter};
pub use channel::{ChannelError, CommandChannel, Reply, DEFAULT_LOAD_TIMEOUT, DEFAULT_REPLY_TIMEOUT};
pub use discovery::{discover, parse_listing, DiscoveryPolicy, PropertyDescriptor};
pub use player::{Player, PlayerError};
pub use process::{find_mplayer, list_properties, spawn_mplayer, PlayerProcess, ProcessError};
pub use protocol::{Completion, PendingCommand, ReplyLine};
pub use types::{cast_for, Cast, CastError, PropertyType, PropertyValue};
