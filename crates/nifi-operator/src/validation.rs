//! Pure validation helpers consumed during configuration synthesis.

use snafu::Snafu;

use crate::crd::{AuthenticationConfig, SensitiveKeyAlgorithm};

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display(
        "zookeeperConfigMapName must not be empty when the clustering backend is ZooKeeper"
    ))]
    ZookeeperReferenceRequired,
}

/// The coordination mechanism a cluster uses for leader election and
/// cluster state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClusteringBackend {
    /// NiFi's native Kubernetes leader election, used when no ZooKeeper
    /// reference is configured.
    Kubernetes,

    /// An external ZooKeeper ensemble, referenced by its discovery
    /// ConfigMap.
    ZooKeeper,
}

/// Derives the clustering backend from the optional ZooKeeper reference.
///
/// An absent reference selects the Kubernetes backend. An empty string is
/// not the same as an absent reference, it is rejected instead of silently
/// falling back.
pub fn clustering_backend(
    zookeeper_config_map_name: Option<&str>,
) -> Result<ClusteringBackend, Error> {
    match zookeeper_config_map_name {
        None => Ok(ClusteringBackend::Kubernetes),
        Some("") => ZookeeperReferenceRequiredSnafu.fail(),
        Some(_) => Ok(ClusteringBackend::ZooKeeper),
    }
}

/// Whether the number of authentication entries is supported, at most one
/// identity backend per cluster.
pub fn authentication_count_valid(auths: &[AuthenticationConfig]) -> bool {
    auths.len() <= 1
}

/// Whether the algorithm is still supported by current NiFi releases.
///
/// The 128 bit variants remain part of the configuration surface for
/// compatibility, synthesis only warns about them.
pub fn sensitive_algorithm_supported(algorithm: SensitiveKeyAlgorithm) -> bool {
    use SensitiveKeyAlgorithm as Algorithm;

    !matches!(
        algorithm,
        Algorithm::NifiArgon2AesGcm128
            | Algorithm::NifiBcryptAesGcm128
            | Algorithm::NifiPbkdf2AesGcm128
            | Algorithm::NifiScryptAesGcm128
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, Ok(ClusteringBackend::Kubernetes))]
    #[case(Some("zk-cm"), Ok(ClusteringBackend::ZooKeeper))]
    #[case(Some(""), Err(Error::ZookeeperReferenceRequired))]
    fn clustering_backend_selection(
        #[case] reference: Option<&str>,
        #[case] expected: Result<ClusteringBackend, Error>,
    ) {
        assert_eq!(clustering_backend(reference), expected);
    }

    #[test]
    fn authentication_count() {
        let auth = AuthenticationConfig {
            authentication_class: "ldap".to_string(),
            oidc: None,
        };

        assert!(authentication_count_valid(&[]));
        assert!(authentication_count_valid(std::slice::from_ref(&auth)));
        assert!(!authentication_count_valid(&[auth.clone(), auth]));
    }

    #[rstest]
    #[case(SensitiveKeyAlgorithm::NifiArgon2AesGcm256, true)]
    #[case(SensitiveKeyAlgorithm::NifiPbkdf2AesGcm256, true)]
    #[case(SensitiveKeyAlgorithm::NifiArgon2AesGcm128, false)]
    #[case(SensitiveKeyAlgorithm::NifiScryptAesGcm128, false)]
    fn legacy_algorithms_are_flagged(
        #[case] algorithm: SensitiveKeyAlgorithm,
        #[case] supported: bool,
    ) {
        assert_eq!(sensitive_algorithm_supported(algorithm), supported);
    }
}
