//! Workspace discovery and task resolution for `wsr`.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod listing;
pub mod locate;
pub mod manifest;
pub mod module;
pub mod resolve;

pub use error::WsrError;

#[cfg(test)]
pub(crate) mod test_env;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
