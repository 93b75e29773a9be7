//! Resolution of the cluster's authentication configuration into a concrete
//! authentication backend and the capability contract all backends fulfill.

use k8s_openapi::api::core::v1::{EnvVar, Volume, VolumeMount};
use snafu::{OptionExt, Snafu, ensure};
use tracing::debug;

use crate::{
    config::{
        properties::PropertiesFile,
        xml::{Standalone, XmlDocument, XmlElement},
    },
    crd::{AuthenticationConfig, authentication::AuthenticationClassProvider},
};

pub mod admin_secret;
mod ldap;
mod oidc;
mod r#static;

pub use self::{ldap::LdapAuthenticator, oidc::OidcAuthenticator, r#static::StaticAuthenticator};

/// Environment variable holding the bcrypt hash of the admin password.
///
/// Both the OIDC and the static backend export it from their init args, the
/// single-user login-identity-provider reads it back. The duplication is
/// deliberate, the hashing commands differ between the two images.
pub const NIFI_ADMIN_PASSWORD_ENV: &str = "NIFI_ADMIN_PASSWORD";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("no authentication specification provided"))]
    NoAuthenticationSpecified,

    #[snafu(display("multiple authentication specifications are not supported, got {count}"))]
    MultipleAuthenticationsUnsupported { count: usize },

    #[snafu(display("authentication class is required"))]
    AuthenticationClassRequired,

    #[snafu(display("AuthenticationClass {class_name:?} was not found"))]
    AuthenticationClassNotFound { class_name: String },

    #[snafu(display("failed to get AuthenticationClass {class_name:?}"))]
    GetAuthenticationClass {
        source: ProviderLookupError,
        class_name: String,
    },

    #[snafu(display(
        "authentication details for OIDC were not specified. The AuthenticationClass {class_name:?} uses an OIDC provider, you need to specify OIDC authentication details (such as client credentials) as well"
    ))]
    OidcAuthenticationDetailsNotSpecified { class_name: String },

    #[snafu(display(
        "the {provider} provider of AuthenticationClass {class_name:?} is not supported for NiFi"
    ))]
    UnsupportedAuthenticationProvider {
        provider: String,
        class_name: String,
    },

    #[snafu(display("failed to build the OIDC discovery url"))]
    BuildOidcDiscoveryUrl {
        source: crate::crd::authentication::oidc::Error,
    },
}

/// The catalog resolving an AuthenticationClass name to its provider.
///
/// In production this is backed by AuthenticationClass objects read from the
/// Kubernetes API, tests use in-memory maps. Lookup failures are opaque to
/// this crate and are propagated, never retried.
pub trait ProviderLookup {
    fn lookup_provider(
        &self,
        class_name: &str,
    ) -> Result<AuthenticationClassProvider, ProviderLookupError>;
}

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum ProviderLookupError {
    #[snafu(display("AuthenticationClass {name:?} was not found"))]
    NotFound { name: String },

    #[snafu(display("failed to get AuthenticationClass {name:?}: {message}"))]
    Upstream { name: String, message: String },
}

/// The uniform capability contract every authentication backend fulfills.
///
/// Implementations never hold secret values, only the names of Secrets and
/// the paths they are mounted at.
pub trait Authenticator {
    /// Environment variables of the NiFi container, secret-backed references
    /// only.
    fn env_vars(&self) -> Vec<EnvVar>;

    /// Volumes to attach to the NiFi Pod.
    fn volumes(&self) -> Vec<Volume>;

    /// Volume mounts to attach to the NiFi containers.
    fn volume_mounts(&self) -> Vec<VolumeMount>;

    /// Properties this backend contributes to `nifi.properties`.
    fn extend_properties(&self) -> Result<Option<PropertiesFile>>;

    /// The rendered `login-identity-providers.xml`.
    fn login_identity_provider_xml(&self) -> String;

    /// Shell fragment executed in the prepare container before the NiFi
    /// process starts.
    fn init_args(&self) -> Option<String>;
}

/// The authentication backend of a cluster, one of the supported variants.
#[derive(Clone, Debug)]
pub enum NifiAuthenticator {
    Ldap(LdapAuthenticator),
    Oidc(OidcAuthenticator),
    Static(StaticAuthenticator),
}

impl Authenticator for NifiAuthenticator {
    fn env_vars(&self) -> Vec<EnvVar> {
        match self {
            Self::Ldap(authenticator) => authenticator.env_vars(),
            Self::Oidc(authenticator) => authenticator.env_vars(),
            Self::Static(authenticator) => authenticator.env_vars(),
        }
    }

    fn volumes(&self) -> Vec<Volume> {
        match self {
            Self::Ldap(authenticator) => authenticator.volumes(),
            Self::Oidc(authenticator) => authenticator.volumes(),
            Self::Static(authenticator) => authenticator.volumes(),
        }
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        match self {
            Self::Ldap(authenticator) => authenticator.volume_mounts(),
            Self::Oidc(authenticator) => authenticator.volume_mounts(),
            Self::Static(authenticator) => authenticator.volume_mounts(),
        }
    }

    fn extend_properties(&self) -> Result<Option<PropertiesFile>> {
        match self {
            Self::Ldap(authenticator) => authenticator.extend_properties(),
            Self::Oidc(authenticator) => authenticator.extend_properties(),
            Self::Static(authenticator) => authenticator.extend_properties(),
        }
    }

    fn login_identity_provider_xml(&self) -> String {
        match self {
            Self::Ldap(authenticator) => authenticator.login_identity_provider_xml(),
            Self::Oidc(authenticator) => authenticator.login_identity_provider_xml(),
            Self::Static(authenticator) => authenticator.login_identity_provider_xml(),
        }
    }

    fn init_args(&self) -> Option<String> {
        match self {
            Self::Ldap(authenticator) => authenticator.init_args(),
            Self::Oidc(authenticator) => authenticator.init_args(),
            Self::Static(authenticator) => authenticator.init_args(),
        }
    }
}

/// The resolved authentication backend of one cluster.
///
/// Created fresh per synthesis call and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Authentication {
    authenticator: NifiAuthenticator,
}

impl Authentication {
    /// Resolves the cluster's authentication configuration against the
    /// AuthenticationClass catalog.
    ///
    /// A cluster supports exactly one authentication entry. The catalog's
    /// provider is dispatched in OIDC > LDAP > Static order, the documented
    /// precedence. Providers NiFi cannot express (TLS, Kerberos) are
    /// rejected.
    pub fn resolve(
        auths: &[AuthenticationConfig],
        cluster_name: &str,
        lookup: &dyn ProviderLookup,
    ) -> Result<Self> {
        let auth = match auths {
            [] => return NoAuthenticationSpecifiedSnafu.fail(),
            [auth] => auth,
            _ => {
                return MultipleAuthenticationsUnsupportedSnafu {
                    count: auths.len(),
                }
                .fail();
            }
        };

        let class_name = auth.authentication_class.as_str();
        ensure!(!class_name.is_empty(), AuthenticationClassRequiredSnafu);
        debug!(authentication_class = class_name, "resolving authentication class");

        let provider = lookup.lookup_provider(class_name).map_err(|err| match err {
            ProviderLookupError::NotFound { name } => {
                Error::AuthenticationClassNotFound { class_name: name }
            }
            err @ ProviderLookupError::Upstream { .. } => Error::GetAuthenticationClass {
                source: err,
                class_name: class_name.to_owned(),
            },
        })?;

        let authenticator = match provider {
            AuthenticationClassProvider::Oidc(provider) => {
                let options = auth
                    .oidc
                    .clone()
                    .context(OidcAuthenticationDetailsNotSpecifiedSnafu { class_name })?;
                NifiAuthenticator::Oidc(OidcAuthenticator {
                    cluster_name: cluster_name.to_owned(),
                    options,
                    provider,
                })
            }
            AuthenticationClassProvider::Ldap(provider) => {
                NifiAuthenticator::Ldap(LdapAuthenticator { provider })
            }
            AuthenticationClassProvider::Static(provider) => {
                NifiAuthenticator::Static(StaticAuthenticator { provider })
            }
            provider => {
                return UnsupportedAuthenticationProviderSnafu {
                    provider: provider.to_string(),
                    class_name,
                }
                .fail();
            }
        };

        Ok(Self { authenticator })
    }

    pub fn env_vars(&self) -> Vec<EnvVar> {
        self.authenticator.env_vars()
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.authenticator.volumes()
    }

    pub fn volume_mounts(&self) -> Vec<VolumeMount> {
        self.authenticator.volume_mounts()
    }

    pub fn extend_properties(&self) -> Result<Option<PropertiesFile>> {
        self.authenticator.extend_properties()
    }

    pub fn login_identity_provider_xml(&self) -> String {
        self.authenticator.login_identity_provider_xml()
    }

    pub fn init_args(&self) -> Option<String> {
        self.authenticator.init_args()
    }
}

/// Wraps a provider stanza into the fixed `login-identity-providers.xml`
/// envelope.
///
/// The first line of the rendered document must be exactly
/// `<?xml version="1.0" encoding="UTF-8" standalone="no"?>`, NiFi fails to
/// start otherwise.
fn login_identity_providers_document(provider: Option<XmlElement>) -> String {
    let mut root = XmlElement::new("loginIdentityProviders");
    if let Some(provider) = provider {
        root.child(provider);
    }
    XmlDocument::new(root, Standalone::No).render()
}
