//! CLI domain: parse, route and output only.
//! Page operations live in [`crate::roki`]; the route table opens the
//! configured backends and dispatches to them.

mod output;
mod parse;
mod route;

pub use output::{format_pages_json, format_pages_text, map_error};
pub use parse::{Cli, Commands, SyncArgs};
pub use route::RunContext;
