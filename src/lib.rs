//! Posemark batch pose-detection and annotation pipeline.
//!
//! The library walks a directory of still images, runs each one through a pose-detection model,
//! overlays bounding boxes, class labels and skeletal keypoints, and writes the annotated result
//! as `<basename>_out.png` into an output directory. Files are processed strictly one at a time,
//! in the directory's native enumeration order; one file's failure never aborts the run.
//!
//! # Environment Variables
//!
//! The `posemark` binary can be configured by setting environment variables:
//!
//! * `POSEMARK_CLASSES`: Comma-separated class names mapping class ids to labels. Defaults to
//!   the single class the deployed model was trained on.
//! * `POSEMARK_THRESHOLD`: Minimum detection confidence, `0.0` to `1.0`. Defaults to
//!   [`nn::YoloPose::DEFAULT_THRESHOLD`].
//! * `RUST_LOG`: Standard `env_logger` filter directives.

use log::LevelFilter;

pub mod annotate;
pub mod detection;
pub mod image;
pub mod nn;
pub mod pipeline;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and posemark will log at *debug* level; `RUST_LOG` overrides take
/// precedence. If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
