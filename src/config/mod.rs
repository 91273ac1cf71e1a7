//! Configuration module

mod blog;

pub use blog::BlogConfig;
