pub mod changelog;
pub mod config;
pub mod conventional;
pub mod error;
pub mod gate;
pub mod git;
pub mod outputs;
pub mod pipeline;
pub mod publish;
pub mod ui;
pub mod version;
pub mod warnings;

pub use error::{ReleaseError, Result};
