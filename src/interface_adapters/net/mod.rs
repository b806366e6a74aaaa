// Network adapter modules split by the game socket vs operator HTTP routes.

pub mod client;
pub mod debug;

pub use client::ws_handler;
pub use debug::debug_state_handler;
