//! Synthesis of the configuration artifacts a NiFi node is started with.
//!
//! Synthesis is a pure function of the cluster configuration, the merged
//! role-group configuration and the resolved authentication backend.
//! Identical input renders byte-identical artifacts, the reconcile loop
//! relies on that to detect configuration drift. Any failure aborts the
//! whole synthesis, partial artifact sets are never returned.

use std::collections::BTreeMap;

use snafu::{ResultExt, Snafu};
use tracing::warn;

use crate::{
    config::{
        properties::{PropertiesFile, file_reference, getenv_reference, to_sorted_properties},
        xml::{Standalone, XmlDocument, XmlElement},
    },
    constants::{
        DEFAULT_SERVER_TLS_KEY_PASSWORD, DEFAULT_SERVER_TLS_STORE_PASSWORD, HTTP_PORT,
        HTTP_PORT_NAME, HTTPS_PORT, HTTPS_PORT_NAME, NIFI_CONFIG_DIR, NIFI_ROOT,
        NIFI_SENSITIVE_PROPERTY_DIR, NIFI_SERVER_TLS_DIR, PROTOCOL_PORT, Repository,
    },
    crd::{ClusterConfig, NodeConfig},
    security::{self, Authentication},
    time::Duration,
    validation::{self, ClusteringBackend},
};

pub mod properties;
pub mod xml;

pub const NIFI_PROPERTIES_FILE: &str = "nifi.properties";
pub const BOOTSTRAP_CONF_FILE: &str = "bootstrap.conf";
pub const LOGIN_IDENTITY_PROVIDERS_FILE: &str = "login-identity-providers.xml";
pub const STATE_MANAGEMENT_FILE: &str = "state-management.xml";

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid clustering backend configuration"))]
    InvalidClusteringBackend { source: validation::Error },

    #[snafu(display("failed to extend nifi.properties with authentication properties"))]
    ExtendAuthenticationProperties { source: security::Error },
}

/// The rendered configuration of one NiFi role group.
///
/// Plain values without any back-reference to the inputs they were rendered
/// from. The reconcile loop materializes them into the node's config volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigArtifacts {
    /// `nifi.properties`, in insertion order.
    pub nifi_properties: PropertiesFile,

    /// `login-identity-providers.xml`, only rendered when authentication is
    /// configured.
    pub login_identity_providers_xml: Option<String>,

    /// `state-management.xml`, identical for every clustering backend.
    pub state_management_xml: String,

    /// `bootstrap.conf` entries, serialized in lexicographic key order.
    pub bootstrap_conf: BTreeMap<String, String>,
}

impl ConfigArtifacts {
    /// Returns the artifact set as file name to file body entries.
    pub fn as_items(&self) -> BTreeMap<String, String> {
        let mut items = BTreeMap::from([
            (
                BOOTSTRAP_CONF_FILE.to_owned(),
                to_sorted_properties(&self.bootstrap_conf),
            ),
            (
                NIFI_PROPERTIES_FILE.to_owned(),
                self.nifi_properties.to_string(),
            ),
            (
                STATE_MANAGEMENT_FILE.to_owned(),
                self.state_management_xml.clone(),
            ),
        ]);

        if let Some(login_identity_providers) = &self.login_identity_providers_xml {
            items.insert(
                LOGIN_IDENTITY_PROVIDERS_FILE.to_owned(),
                login_identity_providers.clone(),
            );
        }

        items
    }
}

/// Name of the container port the health probes target.
pub fn probe_port_name(cluster_config: &ClusterConfig) -> &'static str {
    if cluster_config.tls.is_some() {
        HTTPS_PORT_NAME
    } else {
        HTTP_PORT_NAME
    }
}

/// Renders the configuration artifacts of one role group.
pub struct NodeConfigBuilder<'a> {
    pub cluster_config: &'a ClusterConfig,
    pub merged_config: &'a NodeConfig,
    pub authentication: Option<&'a Authentication>,
}

impl NodeConfigBuilder<'_> {
    pub fn build(&self) -> Result<ConfigArtifacts> {
        Ok(ConfigArtifacts {
            nifi_properties: self.nifi_properties()?,
            login_identity_providers_xml: self
                .authentication
                .map(Authentication::login_identity_provider_xml),
            state_management_xml: self.state_management_xml(),
            bootstrap_conf: self.bootstrap_conf(),
        })
    }

    fn nifi_properties(&self) -> Result<PropertiesFile> {
        let conf = NIFI_CONFIG_DIR;
        let mut properties = PropertiesFile::new();

        properties
            .add("nifi.templates.directory", format!("{conf}/templates"))
            .add("nifi.ui.banner.text", "Welcome to Nifi")
            .add("nifi.ui.autorefresh.interval", "30 sec")
            .add("nifi.nar.library.directory", format!("{NIFI_ROOT}/lib"))
            .add(
                "nifi.nar.library.autoload.directory",
                format!("{NIFI_ROOT}/extensions"),
            )
            .add("nifi.nar.working.directory", format!("{NIFI_ROOT}/work/nar"))
            .add(
                "nifi.documentation.working.directory",
                format!("{NIFI_ROOT}/work/docs/components"),
            );

        // state management
        properties
            .add(
                "nifi.state.management.configuration.file",
                format!("{conf}/{STATE_MANAGEMENT_FILE}"),
            )
            .add("nifi.state.management.provider.local", "local-provider")
            .add("nifi.state.management.provider.cluster", "zk-provider")
            .add("nifi.state.management.embedded.zookeeper.start", "false");

        // database repository
        properties
            .add("nifi.database.directory", Repository::Database.mount_path())
            .add(
                "nifi.h2.url.append",
                ";LOCK_TIMEOUT=25000;WRITE_DELAY=0;AUTO_SERVER=FALSE",
            );

        // flow configuration
        properties
            .add("nifi.flow.configuration.file", format!("{conf}/flow.json.gz"))
            .add("nifi.flow.configuration.archive.enabled", "true")
            .add(
                "nifi.flow.configuration.archive.dir",
                format!("{conf}/archive"),
            )
            .add("nifi.flow.configuration.archive.max.time", "")
            .add("nifi.flow.configuration.archive.max.count", "")
            .add("nifi.flowcontroller.autoResumeState", "true")
            .add("nifi.flowcontroller.graceful.shutdown.period", "10 sec")
            .add("nifi.flowservice.writedelay.interval", "500 ms");

        // flowfile repository
        properties
            .add(
                "nifi.flowfile.repository.implementation",
                "org.apache.nifi.controller.repository.WriteAheadFlowFileRepository",
            )
            .add(
                "nifi.flowfile.repository.wal.implementation",
                "org.apache.nifi.wali.SequentialAccessWriteAheadLog",
            )
            .add(
                "nifi.flowfile.repository.directory",
                Repository::Flowfile.mount_path(),
            )
            .add("nifi.flowfile.repository.checkpoint.interval", "20 sec")
            .add("nifi.flowfile.repository.always.sync", "false")
            .add("nifi.flowfile.repository.retain.orphaned.flowfiles", "true");

        properties
            .add(
                "nifi.swap.manager.implementation",
                "org.apache.nifi.controller.FileSystemSwapManager",
            )
            .add("nifi.queue.swap.threshold", "20000");

        // content repository
        properties
            .add(
                "nifi.content.repository.implementation",
                "org.apache.nifi.content.repository.FileSystemRepository",
            )
            .add("nifi.content.claim.max.appendable.size", "1 MB")
            .add(
                "nifi.content.repository.directory.default",
                Repository::Content.mount_path(),
            )
            .add("nifi.content.repository.archive.max.retention.period", "")
            .add("nifi.content.repository.archive.max.usage.percentage", "50%")
            .add("nifi.content.repository.archive.enabled", "true")
            .add("nifi.content.repository.always.sync", "false")
            .add("nifi.content.viewer.url", "../nifi/content-viewer");

        // provenance repository
        properties
            .add(
                "nifi.provenance.repository.implementation",
                "org.apache.nifi.provenance.WriteAheadProvenanceRepository",
            )
            .add(
                "nifi.provenance.repository.directory.default",
                Repository::Provenance.mount_path(),
            )
            .add("nifi.provenance.repository.max.storage.time", "")
            .add("nifi.provenance.repository.rollover.time", "10 min")
            .add("nifi.provenance.repository.rollover.size", "100 MB")
            .add("nifi.provenance.repository.query.threads", "2")
            .add("nifi.provenance.repository.index.threads", "2")
            .add("nifi.provenance.repository.compress.on.rollover", "true")
            .add("nifi.provenance.repository.always.sync", "false")
            .add(
                "nifi.provenance.repository.indexed.fields",
                "EventType, FlowFileUUID, Filename, ProcessorID, Relationship",
            )
            .add("nifi.provenance.repository.indexed.attributes", "")
            .add("nifi.provenance.repository.index.shard.size", "500 MB")
            .add("nifi.provenance.repository.max.attribute.length", "65536")
            .add("nifi.provenance.repository.concurrent.merge.threads", "2")
            .add("nifi.provenance.repository.buffer.size", "100000");

        // component status history
        properties
            .add(
                "nifi.components.status.repository.implementation",
                "org.apache.nifi.controller.status.history.VolatileComponentStatusRepository",
            )
            .add("nifi.components.status.repository.buffer.size", "14400")
            .add("nifi.components.status.snapshot.frequency", "1 min")
            .add("nifi.status.repository.questdb.persist.node.days", "14")
            .add("nifi.status.repository.questdb.persist.component.days", "3")
            .add(
                "nifi.status.repository.questdb.persist.location",
                Repository::State.mount_path(),
            );

        // web properties, the https block is only rendered when the cluster
        // serves TLS
        if self.cluster_config.tls.is_some() {
            properties
                // NODE_ADDRESS is exported by the prepare container, it is
                // the Pod FQDN
                .add("nifi.web.https.host", getenv_reference("NODE_ADDRESS"))
                .add("nifi.web.https.port", HTTPS_PORT.to_string())
                .add("nifi.web.https.network.interface.default", "")
                .add(
                    "nifi.security.keystore",
                    format!("{NIFI_SERVER_TLS_DIR}/keystore.p12"),
                )
                .add("nifi.security.keystoreType", "PKCS12")
                .add(
                    "nifi.security.keystorePasswd",
                    DEFAULT_SERVER_TLS_KEY_PASSWORD,
                )
                .add(
                    "nifi.security.truststore",
                    format!("{NIFI_SERVER_TLS_DIR}/truststore.p12"),
                )
                .add("nifi.security.truststoreType", "PKCS12")
                .add(
                    "nifi.security.truststorePasswd",
                    DEFAULT_SERVER_TLS_STORE_PASSWORD,
                );
        }
        properties
            .add("nifi.web.http.host", getenv_reference("NODE_ADDRESS"))
            .add("nifi.web.http.port", HTTP_PORT.to_string())
            .add("nifi.web.http.network.interface.default", "");

        properties
            .add(
                "nifi.web.jetty.working.directory",
                format!("{NIFI_ROOT}/work/jetty"),
            )
            .add("nifi.web.jetty.threads", "200")
            .add("nifi.web.max.header.size", "16 KB")
            .add("nifi.web.proxy.context.path", "");

        // sensitive properties
        properties
            .add(
                "nifi.sensitive.props.key",
                file_reference(format!(
                    "{NIFI_SENSITIVE_PROPERTY_DIR}/nifiSensitivePropsKey"
                )),
            )
            .add("nifi.sensitive.props.key.protected", "");
        if let Some(algorithm) = self.cluster_config.sensitive_properties.algorithm {
            if !validation::sensitive_algorithm_supported(algorithm) {
                warn!(
                    %algorithm,
                    "the configured sensitive-properties algorithm is no longer supported by current NiFi releases"
                );
            }
            properties.add("nifi.sensitive.props.algorithm", algorithm.to_string());
        }

        // security properties
        properties
            .add("nifi.administrative.yield.duration", "30 sec")
            .add(
                "nifi.authorizer.configuration.file",
                format!("{conf}/authorizers.xml"),
            )
            .add(
                "nifi.login.identity.provider.configuration.file",
                format!("{conf}/{LOGIN_IDENTITY_PROVIDERS_FILE}"),
            )
            .add(
                "nifi.security.user.login.identity.provider",
                "login-identity-provider",
            )
            .add("nifi.security.user.authorizer", "authorizer")
            .add("nifi.security.allow.anonymous.authentication", "false")
            .add("nifi.cluster.protocol.is.secure", "true")
            .add("nifi.cluster.node.protocol.port", PROTOCOL_PORT.to_string())
            .add("nifi.cluster.flow.election.max.wait.time", "1 min")
            .add("nifi.cluster.flow.election.max.candidates", "");

        properties
            .add("nifi.cluster.is.node", "true")
            .add("nifi.cluster.node.address", getenv_reference("NODE_ADDRESS"));

        // clustering backend
        let backend = validation::clustering_backend(
            self.cluster_config.zookeeper_config_map_name.as_deref(),
        )
        .context(InvalidClusteringBackendSnafu)?;
        match backend {
            ClusteringBackend::Kubernetes => {
                properties
                    .add(
                        "nifi.cluster.leader.election.implementation",
                        "KubernetesLeaderElectionManager",
                    )
                    .add(
                        "nifi.cluster.leader.election.kubernetes.lease.prefix",
                        getenv_reference("STACKLET_NAME"),
                    );
            }
            ClusteringBackend::ZooKeeper => {
                properties
                    .add(
                        "nifi.cluster.leader.election.implementation",
                        "CuratorLeaderElectionManager",
                    )
                    .add(
                        "nifi.zookeeper.connect.string",
                        getenv_reference("ZOOKEEPER_HOSTS"),
                    )
                    .add(
                        "nifi.zookeeper.root.node",
                        getenv_reference("ZOOKEEPER_CHROOT"),
                    );
            }
        }

        // authentication, the backend's keys win over previously set ones
        if let Some(authentication) = self.authentication {
            if let Some(authentication_properties) = authentication
                .extend_properties()
                .context(ExtendAuthenticationPropertiesSnafu)?
            {
                properties.extend(&authentication_properties);
            }
        }

        // python processors
        properties
            .add("nifi.python.command", "python3")
            .add(
                "nifi.python.framework.source.directory",
                format!("{NIFI_ROOT}/python/framework"),
            )
            .add(
                "nifi.python.framework.working.directory",
                format!("{NIFI_ROOT}/python/working"),
            )
            .add(
                "nifi.python.extensions.source.directory.default",
                format!("{NIFI_ROOT}/python/extensions"),
            );

        Ok(properties)
    }

    fn bootstrap_conf(&self) -> BTreeMap<String, String> {
        let graceful_shutdown_timeout = self
            .merged_config
            .graceful_shutdown_timeout
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT);

        BTreeMap::from([
            ("java".to_owned(), "java".to_owned()),
            ("run.as".to_owned(), String::new()),
            ("preserve.environment".to_owned(), "false".to_owned()),
            ("lib.dir".to_owned(), "./lib".to_owned()),
            ("conf.dir".to_owned(), "./conf".to_owned()),
            (
                "graceful.shutdown.seconds".to_owned(),
                graceful_shutdown_timeout.as_secs().to_string(),
            ),
        ])
    }

    fn state_management_xml(&self) -> String {
        let mut local_provider = XmlElement::new("local-provider");
        local_provider
            .child_text("id", "local-provider")
            .child_text(
                "class",
                "org.apache.nifi.controller.state.providers.local.WriteAheadLocalStateProvider",
            )
            .property("Directory", Repository::State.mount_path())
            .property("Always Sync", "false")
            .property("Partitions", "16")
            .property("Checkpoint Interval", "2 mins");

        // Emitted unconditionally, only the provider referenced from
        // nifi.properties is instantiated by the runtime.
        let mut cluster_provider = XmlElement::new("cluster-provider");
        cluster_provider
            .child_text("id", "zk-provider")
            .child_text(
                "class",
                "org.apache.nifi.controller.state.providers.zookeeper.ZooKeeperStateProvider",
            )
            .property("Connect String", getenv_reference("ZOOKEEPER_HOSTS"))
            .property("Root Node", getenv_reference("ZOOKEEPER_CHROOT"))
            .property("Session Timeout", "15 seconds")
            .property("Access Control", "Open");

        let mut root = XmlElement::new("stateManagement");
        root.child(local_provider).child(cluster_provider);

        XmlDocument::new(root, Standalone::Yes).render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{SensitiveKeyAlgorithm, SensitivePropertiesConfig, TlsConfig};

    fn cluster_config(
        tls: Option<TlsConfig>,
        zookeeper_config_map_name: Option<&str>,
    ) -> ClusterConfig {
        ClusterConfig {
            authentication: Vec::new(),
            create_reporting_task_job: None,
            extra_volumes: Vec::new(),
            sensitive_properties: SensitivePropertiesConfig {
                algorithm: Some(SensitiveKeyAlgorithm::NifiArgon2AesGcm256),
                auto_generate: true,
                key_secret: "nifi-sensitive-key".to_string(),
            },
            tls,
            listener_class: None,
            zookeeper_config_map_name: zookeeper_config_map_name.map(str::to_owned),
        }
    }

    fn build(
        tls: Option<TlsConfig>,
        zookeeper_config_map_name: Option<&str>,
    ) -> Result<ConfigArtifacts> {
        let cluster_config = cluster_config(tls, zookeeper_config_map_name);
        let merged_config = NodeConfig::default();
        NodeConfigBuilder {
            cluster_config: &cluster_config,
            merged_config: &merged_config,
            authentication: None,
        }
        .build()
    }

    const HTTPS_KEYS: &[&str] = &[
        "nifi.web.https.host",
        "nifi.web.https.port",
        "nifi.security.keystore",
        "nifi.security.truststore",
    ];

    #[test]
    fn https_keys_are_only_rendered_with_tls() {
        let without_tls = build(None, None).unwrap().nifi_properties;
        for key in HTTPS_KEYS {
            assert!(!without_tls.contains_key(key), "{key} should be absent");
        }
        assert_eq!(without_tls.get("nifi.web.http.port"), Some("8088"));

        let with_tls = build(
            Some(TlsConfig {
                server_secret_class: "tls".to_string(),
            }),
            None,
        )
        .unwrap()
        .nifi_properties;
        for key in HTTPS_KEYS {
            assert!(with_tls.contains_key(key), "{key} should be present");
        }
        assert_eq!(with_tls.get("nifi.web.https.port"), Some("9443"));
    }

    #[test]
    fn probe_port_switches_with_tls() {
        assert_eq!(probe_port_name(&cluster_config(None, None)), "http");
        assert_eq!(
            probe_port_name(&cluster_config(
                Some(TlsConfig {
                    server_secret_class: "tls".to_string(),
                }),
                None
            )),
            "https"
        );
    }

    #[test]
    fn kubernetes_clustering_backend() {
        let properties = build(None, None).unwrap().nifi_properties;

        assert_eq!(
            properties.get("nifi.cluster.leader.election.implementation"),
            Some("KubernetesLeaderElectionManager")
        );
        assert_eq!(
            properties.get("nifi.cluster.leader.election.kubernetes.lease.prefix"),
            Some("{{ getenv \"STACKLET_NAME\" }}")
        );
        assert!(!properties.contains_key("nifi.zookeeper.connect.string"));
        assert!(!properties.contains_key("nifi.zookeeper.root.node"));
    }

    #[test]
    fn zookeeper_clustering_backend() {
        let properties = build(None, Some("zk-cm")).unwrap().nifi_properties;

        assert_eq!(
            properties.get("nifi.cluster.leader.election.implementation"),
            Some("CuratorLeaderElectionManager")
        );
        assert_eq!(
            properties.get("nifi.zookeeper.connect.string"),
            Some("{{ getenv \"ZOOKEEPER_HOSTS\" }}")
        );
        assert!(
            !properties.contains_key("nifi.cluster.leader.election.kubernetes.lease.prefix")
        );
    }

    #[test]
    fn empty_zookeeper_reference_is_rejected() {
        let err = build(None, Some("")).unwrap_err();
        assert!(matches!(err, Error::InvalidClusteringBackend { .. }));
    }

    #[test]
    fn sensitive_properties_block() {
        let properties = build(None, None).unwrap().nifi_properties;

        assert_eq!(
            properties.get("nifi.sensitive.props.key"),
            Some("${file:UTF-8:/stackable/nifi/sensitiveproperty/nifiSensitivePropsKey}")
        );
        assert_eq!(
            properties.get("nifi.sensitive.props.algorithm"),
            Some("NIFI_ARGON2_AES_GCM_256")
        );
    }

    #[test]
    fn algorithm_key_is_absent_when_unconfigured() {
        let mut cluster_config = cluster_config(None, None);
        cluster_config.sensitive_properties.algorithm = None;
        let merged_config = NodeConfig::default();

        let artifacts = NodeConfigBuilder {
            cluster_config: &cluster_config,
            merged_config: &merged_config,
            authentication: None,
        }
        .build()
        .unwrap();

        assert!(
            !artifacts
                .nifi_properties
                .contains_key("nifi.sensitive.props.algorithm")
        );
    }

    #[test]
    fn bootstrap_conf_is_sorted() {
        let artifacts = build(None, None).unwrap();
        let rendered = to_sorted_properties(&artifacts.bootstrap_conf);

        assert_eq!(rendered, indoc::indoc! {"
            conf.dir=./conf
            graceful.shutdown.seconds=30
            java=java
            lib.dir=./lib
            preserve.environment=false
            run.as=
        "});
    }

    #[test]
    fn graceful_shutdown_timeout_from_merged_config() {
        let cluster_config = cluster_config(None, None);
        let merged_config = NodeConfig {
            graceful_shutdown_timeout: Some(Duration::from_secs(120)),
            ..NodeConfig::default()
        };

        let artifacts = NodeConfigBuilder {
            cluster_config: &cluster_config,
            merged_config: &merged_config,
            authentication: None,
        }
        .build()
        .unwrap();

        assert_eq!(
            artifacts.bootstrap_conf["graceful.shutdown.seconds"],
            "120"
        );
    }

    #[test]
    fn state_management_is_always_identical() {
        let kubernetes = build(None, None).unwrap().state_management_xml;
        let zookeeper = build(None, Some("zk-cm")).unwrap().state_management_xml;

        assert_eq!(kubernetes, zookeeper);
        assert!(kubernetes.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"
        ));
        assert!(kubernetes.contains("ZooKeeperStateProvider"));
        assert!(kubernetes.contains("WriteAheadLocalStateProvider"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let first = build(None, Some("zk-cm")).unwrap();
        let second = build(None, Some("zk-cm")).unwrap();

        assert_eq!(first.as_items(), second.as_items());
        assert_eq!(
            first.nifi_properties.to_string(),
            second.nifi_properties.to_string()
        );
    }

    #[test]
    fn login_identity_providers_are_absent_without_authentication() {
        let artifacts = build(None, None).unwrap();
        assert_eq!(artifacts.login_identity_providers_xml, None);
        assert!(!artifacts.as_items().contains_key(LOGIN_IDENTITY_PROVIDERS_FILE));
    }
}
