//! # Quick - Property-Based Testing with Declarative Generators
//!
//! Quick registers properties together with a description of how each of
//! their arguments is generated, runs them against random inputs, and shrinks
//! any failing input to a locally minimal one.
//!
//! ## Quick Start
//!
//! ```rust
//! use quick::{Arguments, QuickCheck, list_of, positive_num};
//!
//! let mut qc = QuickCheck::new();
//! let id = qc
//!     .forall("short lists")
//!     .seed(7)
//!     .arg("x", list_of(positive_num()))
//!     .register(|args: &Arguments| args.list("x").map(|x| x.len() <= 4))
//!     .unwrap();
//!
//! let verdict = qc.verify(qc.experiment(id).unwrap(), true);
//! assert!(!verdict.ok);
//! assert_eq!(verdict.simplified_to.unwrap()["x"].len(), Some(5));
//! ```
//!
//! Descriptions nest freely: `dict_of(text(), list_of("int"))` generates maps
//! from strings to lists of integers, and [`builder`] composes a value out of
//! named children with a user function.

pub mod config;
pub mod error;
pub mod generator;
pub mod parallel;
pub mod property;
pub mod resolve;
pub mod rng;
pub mod runner;
pub mod sample;
pub mod shrink;
pub mod value;

// Re-export the main public API
pub use config::{Config, ConfigError};
pub use error::{Error, InvalidSpecReason, PropertyError, Result};
pub use generator::{Domain, Generator, GeneratorSpec, PrimitiveKind};
pub use parallel::ParallelConfig;
pub use property::Testable;
pub use resolve::{
    Description, Resolver, Tag, boolean, builder, deferred, dict_of, integer, list_of, named,
    number, positive_num, resolve, text,
};
pub use rng::{DefaultRngProvider, RngProvider, create_rng};
pub use runner::{
    Experiment, ExperimentId, FailureReason, ForallBuilder, QuickCheck, Report, TrialRecord,
    Verdict, verify,
};
pub use sample::{Sample, Sampler};
pub use shrink::{ShrinkConfig, ShrinkEngine, ShrinkResult};
pub use value::{Arguments, Value};
