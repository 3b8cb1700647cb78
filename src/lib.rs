pub mod arena;
pub mod bot;
pub mod combat;
pub mod config;
pub mod controller;
pub mod game;
pub mod web;

pub use arena::*;
pub use bot::*;
pub use combat::*;
pub use config::*;
pub use controller::*;
pub use game::*;
