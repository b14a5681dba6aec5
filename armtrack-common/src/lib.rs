//! Shared models, collaborator traits and the error type for the armtrack
//! workspace.
//!
//! The vendor-facing pieces (motion-capture driver, robot SDK, gripper,
//! message broker, reasoning service) are only ever seen through the traits in
//! [`traits`], so every controller component can be driven by test doubles.

pub mod error;
pub mod models;
pub mod traits;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
