//! # laddu-angles
//!
//! Kinematic distributions for isobar decay topologies.
//!
//! Given a decay template, a particle data table and a directory of mass bins, this crate
//! computes the invariant mass of every isobar together with the Gottfried-Jackson angles of
//! the $`X`$ decay and the helicity angles of all subsequent decays. Each observable is
//! evaluated once per Bose-symmetrization term of the final state and histogrammed per range of
//! mass bins.
//!
//! The command-line entry point is the `plot-angles` binary; [`analysis::run`] is the library
//! equivalent:
//! ```ignore
//! use laddu_angles::{analysis::{run, PlotOptions}, diagnostics::Diagnostics};
//!
//! let options = PlotOptions::new("angles.parquet", "template.yaml")
//!     .mass_bins(["1-5"])
//!     .config_file("rootpwa.config");
//! let mut diagnostics = Diagnostics::new();
//! let summary = run(&options, &mut diagnostics)?;
//! println!("{summary}");
//! ```
#![warn(clippy::perf, clippy::style)]
#![warn(missing_docs)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// The histogramming pipeline: range → file → event → permutation.
pub mod analysis;
/// Run configuration read from a YAML file.
pub mod config;
/// Reading (and writing) event files containing production and decay momenta.
pub mod data;
/// Explicit message counters replacing process-wide printing state.
pub mod diagnostics;
/// One-dimensional histograms and their persistence.
pub mod histograms;
/// Resolution of mass-bin directories and their input files.
pub mod mass_bins;
/// Particle properties and the particle data table.
pub mod particles;
/// Isobar decay topologies and Bose symmetrization.
pub mod topology;
/// Vectors, Lorentz transforms, enums and binning helpers.
pub mod utils;

pub use crate::analysis::{run, PlotOptions, RunSummary};
pub use crate::config::Config;
pub use crate::diagnostics::Diagnostics;
pub use crate::histograms::{Axis, Histogram1D, HistogramSettings};
pub use crate::particles::{ParticleDataTable, ParticleProperties};
pub use crate::topology::{
    symmetrization::{AffectedStatus, BoseSymTerm, PermutationTable},
    DecayTopology,
};
pub use crate::utils::enums::Frame;
pub use crate::utils::transforms::LorentzTransform;
pub use crate::utils::vectors::{Vec3, Vec4};

/// Shorthand for results returned by this crate.
pub type AnglesResult<T> = Result<T, AnglesError>;

/// The process exit code reserved for failures to construct a decay topology.
pub const TOPOLOGY_EXIT_CODE: u8 = 5;

/// The error type used by all `laddu-angles` methods
#[derive(Error, Debug)]
pub enum AnglesError {
    /// An alias for [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    /// An alias for [`parquet::errors::ParquetError`].
    #[error("Parquet Error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    /// An alias for [`arrow::error::ArrowError`].
    #[error("Arrow Error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An alias for [`serde_yaml_ng::Error`].
    #[error("YAML Error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),
    /// An alias for [`glob::PatternError`].
    #[error("Invalid glob pattern: {0}")]
    GlobPatternError(#[from] glob::PatternError),
    /// An error in the contents of a configuration file.
    #[error("Invalid configuration in \"{path}\": {reason}")]
    ConfigError {
        /// Path of the offending configuration file
        path: String,
        /// What is wrong with it
        reason: String,
    },
    /// An error which occurs when a decay topology cannot be constructed from a template.
    #[error("Could not construct decay topology: {reason}")]
    TopologyError {
        /// Why construction failed
        reason: String,
    },
    /// An error which occurs when a mass-bin argument does not select any existing mass bin.
    #[error("Mass-bin argument \"{arg}\" does not select any mass bins: {reason}")]
    MissingMassBin {
        /// The `-b` argument which failed
        arg: String,
        /// Why no bins were selected
        reason: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A column or branch which is required but absent from an input file.
    #[error("Missing column \"{name}\"")]
    MissingColumn {
        /// Name of the missing column
        name: String,
    },
    /// Two sequences which must have equal length do not.
    #[error("{context}: expected {expected} entries, found {actual}")]
    LengthMismatch {
        /// What was being compared
        context: String,
        /// The expected length
        expected: usize,
        /// The actual length
        actual: usize,
    },
    /// An error reported by the ROOT backend.
    #[error("ROOT Error: {0}")]
    RootError(String),
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}

impl AnglesError {
    /// Shorthand for constructing an [`AnglesError::TopologyError`].
    pub fn topology<S: Into<String>>(reason: S) -> Self {
        Self::TopologyError {
            reason: reason.into(),
        }
    }

    /// The exit code a command-line program should terminate with after this error.
    ///
    /// Topology construction failures exit with [`TOPOLOGY_EXIT_CODE`], every other failure
    /// with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::TopologyError { .. } => TOPOLOGY_EXIT_CODE,
            _ => 1,
        }
    }
}
