//! Configuration utility types.
//!
//! | Module   | Purpose                                      |
//! |----------|----------------------------------------------|
//! | `error`  | Configuration error types                    |
//! | `handle` | Swappable configuration cell                 |
//! | `paths`  | Resolved project paths                       |

mod error;
mod handle;
mod paths;

pub use error::ConfigError;
pub use handle::{ConfigHandle, content_hash};
pub use paths::{ProjectPaths, detect_master};
