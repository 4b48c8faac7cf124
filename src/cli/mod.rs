pub mod check_connection;
pub mod commands;
pub mod lookup;
pub mod model;
pub mod serve_replies;

pub use check_connection::*;
pub use commands::*;
pub use lookup::*;
pub use model::*;
pub use serve_replies::*;
