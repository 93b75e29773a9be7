//! Configuration synthesis core of the Stackable Operator for Apache NiFi.
//!
//! Given a `NifiCluster` configuration, a merged role-group configuration and
//! a resolved authentication backend, this crate deterministically renders
//! the configuration artifacts a NiFi node is started with: `nifi.properties`,
//! `bootstrap.conf`, `login-identity-providers.xml` and `state-management.xml`.
//! The reconcile loop that applies the rendered artifacts to the cluster is
//! intentionally not part of this crate.

pub mod builder;
pub mod commons;
pub mod config;
pub mod constants;
pub mod crd;
pub mod security;
pub mod time;
pub mod validation;

// External re-exports
pub use k8s_openapi;
pub use kube;
pub use schemars;
