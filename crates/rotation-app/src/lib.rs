// Command-line front end for the rotation engine: config files, box-score
// file loading and CSV/JSON output around `rotation_core::run`.

pub mod app;
pub mod config;
pub mod sink;
pub mod source;
