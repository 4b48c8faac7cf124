pub mod client;
pub mod config;
pub mod context;
pub mod factory;

pub use client::*;
pub use config::*;
pub use context::*;
pub use factory::*;
