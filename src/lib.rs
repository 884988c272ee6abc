//! # vital-forest: survival-outcome classification from tumor expression
//!
//! **Version**: 0.1.0
//!
//! vital-forest joins a clinical table (one record per patient) with a gene
//! expression table (one profile per tumor sample), labels each profile with
//! the patient's vital status, trains a random forest and reports the genes
//! the forest relies on most.
//!
//! ## Data flow
//!
//! - **Alignment**: sample identifiers are reduced to their 12-character
//!   patient prefix and joined against the clinical table in two passes
//! - **Training**: randomized train/test split, CART trees on bootstrap
//!   samples built on a dedicated `rayon` pool
//! - **Registry**: one directory per model plus an append-only index,
//!   addressed by 1-based ordinal
//! - **Reporting**: heap-based top-K over mean impurity decrease
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vital_forest::config::PipelineConfig;
//! use vital_forest::pipeline::{Pipeline, RunMode};
//!
//! let config = PipelineConfig::from_file("vital-forest.toml")?;
//! let report = Pipeline::new(config).run(RunMode::Train)?;
//!
//! for feature in &report.top_features {
//!     println!("{feature}");
//! }
//! # Ok::<(), vital_forest::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod align;
pub mod artifact;
pub mod config;
pub mod error;
pub mod forest;
pub mod identifier;
pub mod importance;
pub mod pipeline;
pub mod registry;
pub mod table;
pub mod topk;
pub mod training;

pub use error::{Error, Result};
