//! Built-in plugins.
//!
//! | Plugin     | Loaded            | Provides                              |
//! |------------|-------------------|---------------------------------------|
//! | `vegalite` | always            | `.vegalite.json` → `.svg`, filter     |
//! | `scss`     | always            | `scss` filter (external `sass`)       |
//! | `markdown` | listed in config  | `markdown` filter                     |

mod markdown;
mod scss;
mod vegalite;

pub use markdown::MarkdownPlugin;
pub use scss::ScssPlugin;
pub use vegalite::VegaLitePlugin;

use std::sync::Arc;

use super::Plugin;

/// Built-ins loaded before anything else, in this order.
pub fn always_on() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(VegaLitePlugin), Arc::new(ScssPlugin)]
}

pub fn is_always_on(name: &str) -> bool {
    matches!(name, vegalite::NAME | scss::NAME)
}

/// Opt-in built-in by config name.
pub fn by_name(name: &str) -> Option<Arc<dyn Plugin>> {
    match name {
        markdown::NAME => Some(Arc::new(MarkdownPlugin)),
        _ => None,
    }
}
