pub mod archive;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod flock;
pub mod lock;
pub mod model;
pub mod report;
pub mod walker;

mod api;

pub use api::{DepFetch, DepFetchBuilder};
