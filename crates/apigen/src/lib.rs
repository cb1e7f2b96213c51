//! API Stub Generation for JVM Class Files
//!
//! Turns compiled classes into API stubs: classes with the same public
//! surface whose method bodies all throw `UnsupportedOperationException`.
//! Consumers compile against the stubs and cannot accidentally run
//! implementation code from them.
//!
//! # Pipeline
//!
//! - [`classifier`] decides from the class header whether a class is API
//! - [`extractor`] filters members, validates exposed types and orders the result
//! - [`synthesizer`] emits the stub class
//!
//! Output is a pure function of the input class and the configuration.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod policy;
pub mod signature;
pub mod synthesizer;

pub use config::{ConfigError, StubConfig};
pub use error::{ApiGenError, Result};
pub use generator::ApiStubGenerator;
pub use policy::AllowedPackagePolicy;
