//! Brick page API server library.
//!
//! Exposes config, state, error handling, routes and the HTTP-side
//! collaborators (media storage, link previews) so integration tests and the
//! binary entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod link_preview;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
