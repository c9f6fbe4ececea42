//! Domain layer for the regcheck compliance workflow
//!
//! This module contains the data model, the error taxonomy and the port
//! traits that infrastructure adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ComplianceError, ComplianceResult, ErrorKind};
