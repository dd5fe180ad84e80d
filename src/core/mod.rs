pub mod config;
pub mod error;
pub mod types;

pub use config::SkillConfig;
pub use error::{Result, SkillError};
pub use types::{SessionState, Slots, Variable};
