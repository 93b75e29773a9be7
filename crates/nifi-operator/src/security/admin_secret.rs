//! Provisioning of the generated admin-password Secret used by the OIDC
//! backend.
//!
//! Synthesis itself never touches secret contents, this module is the only
//! place that generates one. The Kubernetes access is injected through
//! [`SecretStore`] so the decision logic stays testable without a cluster.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use k8s_openapi::{api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use rand::RngCore as _;
use snafu::Snafu;

use crate::constants::NIFI_ADMIN_USERNAME;

const GENERATED_PASSWORD_LENGTH: usize = 16;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "admin password secret {namespace}/{name} exists but does not contain the \"admin\" entry"
    ))]
    AdminEntryMissing { namespace: String, name: String },

    #[snafu(display("failed to access admin password secret {namespace}/{name}"))]
    AccessAdminSecret {
        source: SecretStoreError,
        namespace: String,
        name: String,
    },
}

/// Read access to Secrets, injected by the reconcile loop.
pub trait SecretStore {
    fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool, SecretStoreError>;

    /// Reads one key of a Secret. `Ok(None)` means the Secret exists but
    /// does not contain the key.
    fn secret_read(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, SecretStoreError>;
}

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum SecretStoreError {
    #[snafu(display("secret {namespace}/{name} was not found"))]
    NotFound { namespace: String, name: String },

    #[snafu(display("failed to read secret {namespace}/{name}: {message}"))]
    Upstream {
        namespace: String,
        name: String,
        message: String,
    },
}

pub fn admin_password_secret_name(cluster_name: &str) -> String {
    format!("{cluster_name}-oidc-admin-password")
}

fn generate_admin_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_LENGTH];
    rand::rng().fill_bytes(&mut bytes);

    let mut password = STANDARD.encode(bytes);
    password.truncate(GENERATED_PASSWORD_LENGTH);
    password
}

/// Builds the admin-password Secret with a freshly generated password under
/// the `admin` key.
pub fn build_admin_password_secret(cluster_name: &str, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(admin_password_secret_name(cluster_name)),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        string_data: Some(BTreeMap::from([(
            NIFI_ADMIN_USERNAME.to_owned(),
            generate_admin_password(),
        )])),
        ..Secret::default()
    }
}

/// Decides whether the admin-password Secret has to be created.
///
/// Returns the Secret to apply when it does not exist yet, `None` when a
/// complete Secret is already in place. An existing Secret without the
/// `admin` entry is a configuration error, it is never overwritten.
pub fn ensure_admin_password_secret(
    store: &dyn SecretStore,
    cluster_name: &str,
    namespace: &str,
) -> Result<Option<Secret>> {
    let name = admin_password_secret_name(cluster_name);

    let exists = store
        .secret_exists(namespace, &name)
        .map_err(|source| Error::AccessAdminSecret {
            source,
            namespace: namespace.to_owned(),
            name: name.clone(),
        })?;

    if !exists {
        return Ok(Some(build_admin_password_secret(cluster_name, namespace)));
    }

    match store.secret_read(namespace, &name, NIFI_ADMIN_USERNAME) {
        Ok(Some(_)) => Ok(None),
        Ok(None) => AdminEntryMissingSnafu {
            namespace,
            name,
        }
        .fail(),
        Err(source) => Err(Error::AccessAdminSecret {
            source,
            namespace: namespace.to_owned(),
            name,
        }),
    }
}
