//! capgrab Cloud Abstraction
//!
//! This crate provides the provider abstraction used by the capgrab
//! acquisition engine: the [`ProviderGateway`] trait, its error type, and
//! the launch/instance model shared by every provider implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  capgrab CLI                     │
//! │              (capgrab launch)                    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 capgrab-core                     │
//! │   engine / rotation / readiness / batch          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                capgrab-cloud                     │
//! │  trait ProviderGateway { ... }                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │  oci provider │
//!           └───────────────┘
//! ```

pub mod error;
pub mod model;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result, ServiceError};
pub use model::{
    BurstTier, ImageSource, InstanceAddress, InstanceState, LaunchPlan, LaunchRequest,
    LaunchedInstance, NetworkInterface, RetryBudget, ShapeSpec, SubnetSource,
};
pub use provider::ProviderGateway;
