//! Domain core for the brick page builder.
//!
//! Holds everything that decides what a page looks like: grid geometry,
//! per-type brick rules, the brick domain model and its persisted snapshot
//! format, the reducer that edits it, and the auto-save controller that
//! flushes it. No database or HTTP dependencies live here.

pub mod autosave;
pub mod brick;
pub mod brick_rules;
pub mod editor;
pub mod error;
pub mod grid;
pub mod link;
pub mod media;
pub mod page;
pub mod page_grid;
pub mod reducer;
pub mod types;
