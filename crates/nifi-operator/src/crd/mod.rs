//! The `NifiCluster` custom resource and the configuration types nested in
//! its spec.

use std::collections::HashMap;

use k8s_openapi::{
    api::core::v1::{ResourceRequirements, Volume},
    apimachinery::pkg::apis::meta::v1::Condition,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{crd::authentication::oidc, time::Duration};

pub mod authentication;

/// A NiFi cluster stacklet. This resource is managed by the Stackable operator
/// for Apache NiFi. Find more information on how to use it and the resources
/// that the operator generates in the [operator documentation](DOCS_BASE_URL_PLACEHOLDER/nifi/).
#[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, Serialize)]
#[kube(
    group = "nifi.stackable.tech",
    version = "v1alpha1",
    kind = "NifiCluster",
    plural = "nificlusters",
    status = "NifiClusterStatus",
    namespaced,
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct NifiClusterSpec {
    /// Settings that affect all roles and role groups.
    pub cluster_config: ClusterConfig,

    /// The node role, consisting of one or more role groups.
    pub nodes: NodesSpec,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NifiClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Authentication options for all NiFi nodes.
    /// At most one entry is supported.
    #[serde(default)]
    pub authentication: Vec<AuthenticationConfig>,

    /// Configuration of the Job creating the NiFi reporting task.
    /// Declared here, materialized by the reconcile loop.
    pub create_reporting_task_job: Option<CreateReportingTaskJobConfig>,

    /// Extra volumes to attach to every NiFi node Pod, e.g. for processors
    /// that read their configuration from files. Passed through verbatim.
    #[serde(default)]
    pub extra_volumes: Vec<Volume>,

    /// Configuration of how the key protecting sensitive properties in
    /// `nifi.properties` is obtained.
    pub sensitive_properties: SensitivePropertiesConfig,

    /// TLS configuration of the NiFi web interface. If set, nodes serve
    /// HTTPS with certificates from the given SecretClass.
    pub tls: Option<TlsConfig>,

    /// The ListenerClass exposing the NiFi web interface.
    pub listener_class: Option<String>,

    /// Name of the discovery ConfigMap of the ZooKeeper ensemble used for
    /// leader election and cluster state. If not set, NiFi's native
    /// Kubernetes leader election is used instead.
    pub zookeeper_config_map_name: Option<String>,
}

/// A reference to the authentication backend of the cluster plus
/// backend-specific options that only make sense on the product side.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationConfig {
    /// Name of the [AuthenticationClass](DOCS_BASE_URL_PLACEHOLDER/concepts/authentication)
    /// used to authenticate users.
    pub authentication_class: String,

    /// This field contains OIDC-specific configuration. It is only required
    /// in case OIDC is used.
    pub oidc: Option<oidc::ClientAuthenticationOptions>,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportingTaskJobConfig {
    /// Whether the Job reporting NiFi metrics is created.
    #[serde(default = "CreateReportingTaskJobConfig::default_enable")]
    pub enable: bool,
}

impl CreateReportingTaskJobConfig {
    const fn default_enable() -> bool {
        true
    }
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivePropertiesConfig {
    /// The algorithm deriving the key protecting sensitive properties.
    pub algorithm: Option<SensitiveKeyAlgorithm>,

    /// Whether the key Secret is generated if it is missing.
    #[serde(default)]
    pub auto_generate: bool,

    /// Name of the Secret containing the sensitive-properties key.
    pub key_secret: String,
}

/// The cipher/KDF combinations NiFi accepts for sensitive-property
/// protection. The 128 bit variants are still accepted for compatibility
/// with existing clusters but are no longer supported by current NiFi
/// releases, see [`crate::validation::sensitive_algorithm_supported`].
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize, strum::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum SensitiveKeyAlgorithm {
    #[strum(serialize = "NIFI_ARGON2_AES_GCM_128")]
    NifiArgon2AesGcm128,

    #[strum(serialize = "NIFI_ARGON2_AES_GCM_256")]
    NifiArgon2AesGcm256,

    #[strum(serialize = "NIFI_BCRYPT_AES_GCM_128")]
    NifiBcryptAesGcm128,

    #[strum(serialize = "NIFI_BCRYPT_AES_GCM_256")]
    NifiBcryptAesGcm256,

    #[strum(serialize = "NIFI_PBKDF2_AES_GCM_128")]
    NifiPbkdf2AesGcm128,

    #[strum(serialize = "NIFI_PBKDF2_AES_GCM_256")]
    NifiPbkdf2AesGcm256,

    #[strum(serialize = "NIFI_SCRYPT_AES_GCM_128")]
    NifiScryptAesGcm128,

    #[strum(serialize = "NIFI_SCRYPT_AES_GCM_256")]
    NifiScryptAesGcm256,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Name of the SecretClass providing the server certificate of the NiFi
    /// web interface.
    pub server_secret_class: String,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodesSpec {
    /// The role groups of the node role, keyed by role-group name.
    #[serde(default)]
    pub role_groups: HashMap<String, RoleGroupSpec>,

    /// Role-level configuration, inherited by all role groups.
    pub config: Option<NodeConfig>,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGroupSpec {
    /// The number of NiFi nodes in this role group.
    pub replicas: Option<i32>,

    /// Role-group level configuration, overriding the role-level one.
    pub config: Option<NodeConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Time period Pods have to gracefully shut down, e.g. `30s`, `2m` or
    /// `1h`.
    pub graceful_shutdown_timeout: Option<Duration>,

    /// CPU and memory requests and limits of the NiFi container.
    pub resources: Option<ResourceRequirements>,

    /// JVM argument overrides applied to the NiFi process.
    pub jvm_argument_overrides: Option<JvmArgumentOverrides>,
}

impl NodeConfig {
    /// Merges role-level and role-group level configuration into the
    /// effective configuration of one role group. The merge is a shallow
    /// override, a field set on the role group wins as a whole.
    pub fn merged(role: Option<&Self>, group: Option<&Self>) -> Self {
        Self {
            graceful_shutdown_timeout: group
                .and_then(|config| config.graceful_shutdown_timeout)
                .or_else(|| role.and_then(|config| config.graceful_shutdown_timeout)),
            resources: group
                .and_then(|config| config.resources.clone())
                .or_else(|| role.and_then(|config| config.resources.clone())),
            jvm_argument_overrides: group
                .and_then(|config| config.jvm_argument_overrides.clone())
                .or_else(|| role.and_then(|config| config.jvm_argument_overrides.clone())),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JvmArgumentOverrides {
    /// JVM arguments added to the generated ones.
    #[serde(default)]
    pub add: Vec<String>,

    /// Exact JVM arguments removed from the generated ones.
    #[serde(default)]
    pub remove: Vec<String>,

    /// Regexes matching JVM arguments to remove from the generated ones.
    #[serde(default)]
    pub remove_regex: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_key_algorithm_serialization() {
        let algorithm: SensitiveKeyAlgorithm =
            serde_yaml::from_str("nifiArgon2AesGcm256").unwrap();
        assert_eq!(algorithm, SensitiveKeyAlgorithm::NifiArgon2AesGcm256);
        assert_eq!(algorithm.to_string(), "NIFI_ARGON2_AES_GCM_256");
    }

    #[test]
    fn node_config_shallow_merge() {
        let role = NodeConfig {
            graceful_shutdown_timeout: Some(Duration::from_secs(60)),
            resources: None,
            jvm_argument_overrides: Some(JvmArgumentOverrides {
                add: vec!["-Xmx2g".to_string()],
                ..JvmArgumentOverrides::default()
            }),
        };
        let group = NodeConfig {
            graceful_shutdown_timeout: Some(Duration::from_secs(30)),
            ..NodeConfig::default()
        };

        let merged = NodeConfig::merged(Some(&role), Some(&group));

        // the group value wins field by field, unset fields fall back to the
        // role level
        assert_eq!(
            merged.graceful_shutdown_timeout,
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            merged.jvm_argument_overrides,
            role.jvm_argument_overrides
        );
        assert_eq!(merged.resources, None);
    }

    #[test]
    fn minimal_cluster_config() {
        let config = serde_yaml::from_str::<ClusterConfig>(
            "
            sensitiveProperties:
              keySecret: nifi-sensitive-key
            zookeeperConfigMapName: nifi-zk
            ",
        )
        .unwrap();

        assert!(config.authentication.is_empty());
        assert_eq!(config.sensitive_properties.algorithm, None);
        assert!(!config.sensitive_properties.auto_generate);
        assert_eq!(config.zookeeper_config_map_name.as_deref(), Some("nifi-zk"));
    }
}
