pub mod cli;
pub mod controller;
pub mod prompt;

pub use cli::Cli;
pub use controller::Courier;
