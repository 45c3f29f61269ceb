//! fleettop core: payload types, display formatting, card rendering and the
//! polling session. The terminal front end lives in the binary.

pub mod card;
pub mod demo;
pub mod environment;
pub mod format;
pub mod logging;
pub mod monitor;
pub mod poller;
pub mod profiles;
pub mod session;
pub mod source;
pub mod types;
