//! Dataset model and pattern-analysis primitives for the mvpa command line
//!
//! The crate is organised around [`Dataset`]: a samples x features matrix with
//! per-sample and per-feature attribute columns. Everything else operates on it:
//!
//! - [`io`]: JSON and binary persistence, text matrix and attribute import.
//! - [`select`]: attribute filter expressions for samples and features.
//! - [`mappers`]: detrending, z-scoring and invariant-feature removal.
//! - [`clf`]: kNN, Gaussian naive Bayes and nearest-mean classifiers.
//! - [`partition`]: chunk-based train/test splits.
//! - [`crossval`]: cross-validation, confusion matrices, permutation tests.
//! - [`searchlight`]: sphere neighbourhoods and the parallel searchlight.
//! - [`stats`]: descriptive statistics, Student's t distribution and t-tests.
//! - [`events`]: event-related (boxcar) dataset construction.
//! - [`atlas`]: label lookup on a voxel grid.
//! - [`motion`]: head-motion quality control.
//!
//! Diagnostic output goes through `log` on the targets listed in
//! [`channels`], so a frontend can switch them on one by one.

#![warn(clippy::all)]

pub mod atlas;
pub mod attr;
pub mod clf;
pub mod crossval;
pub mod dataset;
pub mod error;
pub mod events;
pub mod io;
pub mod mappers;
pub mod motion;
pub mod partition;
pub mod searchlight;
pub mod select;
pub mod stats;

pub use attr::{AttrValue, Attribute, Collection};
pub use dataset::Dataset;
pub use error::{MvpaError, Result};

/// Log targets used by this crate, one per debug channel.
pub mod channels {
    /// Dataset construction and attribute handling
    pub const DATASET: &str = "dataset";
    /// Reading and writing files
    pub const IO: &str = "io";
    /// Preprocessing mappers
    pub const MAPPER: &str = "mapper";
    /// Classifier training and prediction
    pub const CLF: &str = "clf";
    /// Partition generation
    pub const PARTITION: &str = "partition";
    /// Cross-validation folds
    pub const CROSSVAL: &str = "crossval";
    /// Searchlight neighbourhoods and centres
    pub const SEARCHLIGHT: &str = "searchlight";
    /// Statistical tests
    pub const STATS: &str = "stats";
    /// Event-related dataset construction
    pub const EVENTS: &str = "events";
    /// Atlas lookups
    pub const ATLAS: &str = "atlas";
    /// Motion quality control
    pub const MOTION: &str = "motion";

    /// All channels emitted by the library.
    pub const ALL: &[&str] = &[
        DATASET, IO, MAPPER, CLF, PARTITION, CROSSVAL, SEARCHLIGHT, STATS, EVENTS, ATLAS, MOTION,
    ];
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
