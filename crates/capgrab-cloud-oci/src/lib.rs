//! Oracle Cloud Infrastructure provider for capgrab
//!
//! This crate implements the [`ProviderGateway`](capgrab_cloud::ProviderGateway)
//! trait for OCI, enabling capgrab to race for compute capacity.
//!
//! # Features
//!
//! - Instance launch with flexible shape configuration
//! - Image, subnet and shape resolution before the first attempt
//! - Lifecycle and VNIC queries for readiness checks
//! - Public address listing for the IP export pass
//!
//! # Requirements
//!
//! - `oci` CLI must be installed and configured
//! - Authentication is managed through the CLI config file and profiles
//!
//! # Example
//!
//! ```ignore
//! use capgrab_cloud::ProviderGateway;
//! use capgrab_cloud_oci::{OciAccount, OciGateway, OciProfile};
//!
//! let gateway = OciGateway::new(OciAccount {
//!     tenancy: "ocid1.tenancy.oc1..xxxx".into(),
//!     profile: OciProfile {
//!         profile: Some("TOKYO".into()),
//!         ..Default::default()
//!     },
//! });
//!
//! let zones = gateway.list_availability_zones().await?;
//! ```

pub mod cli;
pub mod error;
pub mod provider;

pub use cli::{OciCli, OciProfile};
pub use error::{OciError, Result};
pub use provider::{OciAccount, OciGateway};
