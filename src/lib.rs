//! Atelier - installation backend for a creative desktop suite.
//!
//! Atelier inspects a Linux workstation for a fixed catalog of creative
//! applications, reports installed/available/customized status, and performs
//! multi-step installs: native apt packages, Flatpak apps, and Flatpak apps
//! patched with third-party configuration overlays (PhotoGIMP, Inkustrator).
//!
//! # Modules
//!
//! - [`cache`] - TTL-bounded memo for installed/availability probes
//! - [`catalog`] - Static program catalog, install methods and patch data
//! - [`cli`] - Command-line interface and argument parsing
//! - [`error`] - Error types and result aliases
//! - [`extract`] - Archive extraction for downloaded patches
//! - [`orchestrator`] - The multi-step install state machine
//! - [`placement`] - Parallel placement of patch contents
//! - [`probe`] - dpkg/Flatpak/config-marker status probes
//! - [`process`] - External command invocation
//! - [`suite`] - The two-call facade the UI layer depends on
//! - [`transfer`] - Streamed archive downloads
//!
//! # Example
//!
//! ```no_run
//! use atelier::suite::Suite;
//!
//! let suite = Suite::new();
//! for program in suite.get_programs() {
//!     println!("{} ({})", program.name, program.category);
//! }
//! let result = suite.install_program("GIMP", "apt");
//! println!("{}", result.message);
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod placement;
pub mod probe;
pub mod process;
pub mod suite;
pub mod transfer;

pub use error::{AtelierError, Result};
