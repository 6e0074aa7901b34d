//! Terminal side of the reconciliation engine
//!
//! The engine itself lives in the `declarative` crate. This module supplies
//! what it leaves to the host:
//! 1. Display - plan and refresh output
//! 2. Callbacks - progress with state checkpoints, confirmation, retry notices

pub mod differ;
pub mod executor;

pub use differ::{display_plan, display_refresh};
pub use executor::{PromptConfirm, TerminalProgress, TerminalRetry, print_summary};
