// Library root
// -----------
// The binary (`main.rs`) wires these modules into a single run: pick a
// random recent Mars rover photo, post it to Bluesky, clean up.
//
// Module responsibilities:
// - `config`: environment-derived settings, built once at startup.
// - `nasa`: photo listing, random selection, download to disk.
// - `bluesky`: XRPC client (login, blob upload, post) and the publish flow.
// - `richtext`: hashtag / link / mention facet detection for post text.
// - `app`: orchestration, caption text, and cleanup of the local file.
// - `http`, `progress`, `logging`, `error`: shared plumbing.
pub mod app;
pub mod bluesky;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod nasa;
pub mod progress;
pub mod richtext;

pub use error::{Error, Result};
