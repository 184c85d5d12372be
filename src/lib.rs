//! carscan: capture or pick a photo of a car, review it, submit it to a
//! prediction service and keep the result.
//!
//! - [`workflow`]: the capture → review → submit state machine
//! - [`prediction`]: multipart client for the prediction endpoint
//! - [`services`]: collaborator traits and their local implementations
//! - [`remote`]: HTTP per-user store and push relay
//! - [`config`]: `carscan.toml` loading

pub mod config;
pub mod error;
pub mod prediction;
pub mod remote;
pub mod services;
pub mod workflow;

pub use error::{CarscanError, WorkflowError};
