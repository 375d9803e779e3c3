// src/lib.rs

//! Natural-language command orchestration for a camera application.
//!
//! Raw text is interpreted into a [`model::Directive`], planned against the
//! [`tools::CapabilityRegistry`] and executed step by step by the
//! [`orchestrator::Orchestrator`].

pub mod cases;
pub mod cli;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod llm;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod protocol;
pub mod reconcile;
pub mod tools;
pub mod validation;

pub use error::{AppError, Result};
