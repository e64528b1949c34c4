pub mod data;
pub mod io;
pub mod printing;

#[cfg(test)]
mod tests;

pub use data::{path_display, Config, RevealSettings};
pub use io::ConfigError;
