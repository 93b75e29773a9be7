//! Read-only path and port tables shared across the configuration synthesis.
//!
//! Everything in here is initialized once and never mutated afterwards.

use std::sync::LazyLock;

use const_format::concatcp;
use k8s_openapi::api::core::v1::ContainerPort;

pub const APP_NAME: &str = "nifi";

/// The principal every provisioned admin identity uses.
pub const NIFI_ADMIN_USERNAME: &str = "admin";

pub const STACKABLE_ROOT: &str = "/stackable";
pub const STACKABLE_DATA_DIR: &str = concatcp!(STACKABLE_ROOT, "/data");

/// Base path under which secret-operator volumes are mounted, one
/// subdirectory per SecretClass.
pub const SECRET_BASE_PATH: &str = concatcp!(STACKABLE_ROOT, "/secrets");

/// Mount point of the volume holding the admin user's password file.
pub const USER_MOUNT_DIR: &str = concatcp!(STACKABLE_ROOT, "/users");

/// Base path for client TLS material, one subdirectory per peer (e.g. `ldap`).
pub const TLS_MOUNT_DIR: &str = concatcp!(STACKABLE_ROOT, "/tls");

pub const NIFI_ROOT: &str = concatcp!(STACKABLE_ROOT, "/", APP_NAME);
pub const NIFI_CONFIG_DIR: &str = concatcp!(NIFI_ROOT, "/conf");
pub const NIFI_SENSITIVE_PROPERTY_DIR: &str = concatcp!(NIFI_ROOT, "/sensitiveproperty");
pub const NIFI_SERVER_TLS_DIR: &str = concatcp!(NIFI_ROOT, "/server-tls");

/// Store passwords for the PKCS12 keystore/truststore pairs the
/// secret-operator provisions. These protect files that only exist inside
/// the Pod filesystem, so the Java default is kept.
pub const DEFAULT_SERVER_TLS_STORE_PASSWORD: &str = "changeit";
pub const DEFAULT_SERVER_TLS_KEY_PASSWORD: &str = "changeit";

pub const HTTP_PORT_NAME: &str = "http";
pub const HTTP_PORT: u16 = 8088;
pub const HTTPS_PORT_NAME: &str = "https";
pub const HTTPS_PORT: u16 = 9443;
pub const PROTOCOL_PORT_NAME: &str = "protocol";
pub const PROTOCOL_PORT: u16 = 9088;
pub const BALANCE_PORT_NAME: &str = "balance";
pub const BALANCE_PORT: u16 = 6243;
pub const METRICS_PORT_NAME: &str = "metrics";
pub const METRICS_PORT: u16 = 8081;

/// The container ports of a NiFi node, in the order they are attached to the
/// workload spec.
pub static CONTAINER_PORTS: LazyLock<Vec<ContainerPort>> = LazyLock::new(|| {
    [
        (HTTP_PORT_NAME, HTTP_PORT),
        (HTTPS_PORT_NAME, HTTPS_PORT),
        (PROTOCOL_PORT_NAME, PROTOCOL_PORT),
        (BALANCE_PORT_NAME, BALANCE_PORT),
        (METRICS_PORT_NAME, METRICS_PORT),
    ]
    .into_iter()
    .map(|(name, port)| ContainerPort {
        name: Some(name.to_owned()),
        container_port: i32::from(port),
        ..ContainerPort::default()
    })
    .collect()
});

/// The repositories a NiFi node persists, each mounted at its own path below
/// [`STACKABLE_DATA_DIR`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Repository {
    Database,
    Flowfile,
    Content,
    Provenance,
    State,
}

impl Repository {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Database => "data",
            Self::Flowfile => "flowfile",
            Self::Content => "content",
            Self::Provenance => "provenance",
            Self::State => "state",
        }
    }

    pub fn mount_path(self) -> String {
        format!(
            "{STACKABLE_DATA_DIR}/{suffix}-repository",
            suffix = self.suffix()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_mount_paths() {
        assert_eq!(
            Repository::Database.mount_path(),
            "/stackable/data/data-repository"
        );
        assert_eq!(
            Repository::State.mount_path(),
            "/stackable/data/state-repository"
        );
    }

    #[test]
    fn container_ports_are_complete() {
        let names = CONTAINER_PORTS
            .iter()
            .filter_map(|port| port.name.as_deref())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![
            "http", "https", "protocol", "balance", "metrics"
        ]);
    }
}
