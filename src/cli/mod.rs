//! Command-line interface module.

mod args;
mod lifecycle;

pub use args::Cli;
pub use lifecycle::run;
