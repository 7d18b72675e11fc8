//! Timing judgment and section progression for a music-driven rhythm game.
//!
//! [`game::gameplay`] judges presses against the live track,
//! [`game::progression`] turns timeline markers and failures into commands,
//! and [`game::session::Session`] runs both once per frame against the
//! collaborators in [`core`].

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
