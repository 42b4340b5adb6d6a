#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
//! # Synthetic Sonar Imaging
//!
//! Sonar views turn range and intensity rasters of a scene into sonar
//! images. Three variants share one pipeline shape:
//!
//! | Variant | Capture | History |
//! |---|---|---|
//! | [`Fls`] forward-looking | up to nine 20° views side by side | none |
//! | [`Msis`] mechanically scanning | one narrow beam per tick | rotation image |
//! | [`Sss`] side-scan | port and starboard views | ping-pong waterfall |
//!
//! Every stage after the capture is a [`compute::Kernel`] dispatched through
//! the backend held by a shared [`SonarContext`]. Each tick the owning
//! sensor stages a pose, commits it, computes the output and draws the
//! display; the resulting images reach its [`SonarMailbox`] one commit
//! later.

pub mod capture;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod fls;
pub mod geometry;
pub mod msis;
pub mod readback;
pub mod scan;
pub mod sonar;
pub mod sss;
pub mod view;

pub use capture::{CapturePass, CaptureTarget, SceneRenderer};
pub use config::{FlsConfig, MsisConfig, Noise, RangeWindow, SonarConfig, SssConfig};
pub use context::{KernelSet, SonarContext};
pub use display::DisplayMesh;
pub use error::SonarError;
pub use fls::{BeamPartition, Fls};
pub use geometry::ViewGeometry;
pub use msis::Msis;
pub use readback::{DataChannel, SonarFrame, SonarMailbox};
pub use scan::RotationStepper;
pub use sonar::{Sonar, SonarPipeline};
pub use sss::Sss;
pub use view::{CommitOutcome, SonarKind, SonarSettings, SonarView};
