//! Configuration, state, logging, and server bootstrap

pub mod config;
pub mod logging;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::Server;
pub use state::ServerState;
