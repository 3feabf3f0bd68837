pub mod cache;
pub mod service;

mod macros;

pub use log;
