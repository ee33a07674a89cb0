pub mod catalog;
pub mod config;

pub use self::catalog::*;
pub use self::config::*;
