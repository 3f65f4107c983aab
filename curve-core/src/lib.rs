//! Curve Core
//!
//! Runtime-agnostic building blocks shared by `curve-codec`:
//! - Wire-format size constants and configurable limits (`limits`)
//! - Tunable per-instance knobs (`config`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod limits;

pub mod prelude {
    pub use crate::config::{CodecConfig, DEFAULT_ZAP_TIMEOUT};
    pub use crate::limits::*;
}
