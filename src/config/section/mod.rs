//! Configuration section definitions.
//!
//! | Module         | Section          | Purpose                          |
//! |----------------|------------------|----------------------------------|
//! | `browser`      | `[browser]`      | Chrome executable and flags      |
//! | `inline`       | `[inline]`       | Resource inlining and compression|
//! | `network_idle` | `[network_idle]` | Idle window after navigation     |
//! | `plugins`      | `plugins = [..]` | Plugin list entries              |
//! | `serve`        | `[serve]`        | Report server address            |
//! | `watch`        | `[watch]`        | Watched extensions, stability    |

mod browser;
mod inline;
mod network_idle;
mod plugins;
mod serve;
mod watch;

pub use browser::BrowserConfig;
pub use inline::InlineConfig;
pub use network_idle::NetworkIdleConfig;
pub use plugins::PluginSpec;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
