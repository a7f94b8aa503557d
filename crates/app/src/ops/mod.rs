pub mod branch;
pub mod cat;
pub mod cp;
pub mod init;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod projects;
pub mod pull;
pub mod put;
pub mod rm;
pub mod search;
pub mod stat;
pub mod version;

pub use branch::Branch;
pub use cat::Cat;
pub use cp::Cp;
pub use init::Init;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use mv::Mv;
pub use projects::Projects;
pub use pull::Pull;
pub use put::Put;
pub use rm::Rm;
pub use search::Search;
pub use stat::Stat;
pub use version::Version;

use chrono::{DateTime, SecondsFormat};

/// Paths may be given without the leading slash
pub(crate) fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Render epoch milliseconds, `-` when unknown
pub(crate) fn format_millis(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) if millis != 0 => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => "-".to_string(),
    }
}
