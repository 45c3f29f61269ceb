//! UI module root: exposes drawing functions for individual panels.

pub mod cards;
pub mod controls;
pub mod header;
pub mod theme;
pub mod util;
