//! Statistics for the EEG stress agent.
//!
//! Tracks what the agent processed and decided, so a session can be
//! audited without keeping the raw signal.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
