//! The AuthenticationClass catalog entry and the provider descriptors
//! resolvable through it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod kerberos;
pub mod ldap;
pub mod oidc;
pub mod r#static;
pub mod tls;

/// The Stackable Platform uses the AuthenticationClass as a central mechanism to handle user
/// authentication across supported products.
///
/// The authentication mechanism needs to be configured only in the AuthenticationClass which is
/// then referenced in the product. Multiple different authentication providers are supported.
/// Learn more in the [authentication concept documentation][1].
///
/// [1]: DOCS_BASE_URL_PLACEHOLDER/concepts/authentication
#[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, Serialize)]
#[kube(
    group = "authentication.stackable.tech",
    version = "v1alpha1",
    kind = "AuthenticationClass",
    plural = "authenticationclasses",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationClassSpec {
    /// Provider used for authentication like LDAP or OIDC.
    pub provider: AuthenticationClassProvider,
}

#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::large_enum_variant)]
pub enum AuthenticationClassProvider {
    /// The [static provider](https://DOCS_BASE_URL_PLACEHOLDER/concepts/authentication#_static)
    /// is used to configure a static set of users, identified by username and password.
    Static(r#static::AuthenticationProvider),

    /// The [LDAP provider](DOCS_BASE_URL_PLACEHOLDER/concepts/authentication#_ldap).
    Ldap(ldap::AuthenticationProvider),

    /// The OIDC provider can be used to configure OpenID Connect.
    Oidc(oidc::AuthenticationProvider),

    /// The [TLS provider](DOCS_BASE_URL_PLACEHOLDER/concepts/authentication#_tls).
    /// The TLS AuthenticationClass is used when users should authenticate themselves with a TLS certificate.
    Tls(tls::AuthenticationProvider),

    /// The [Kerberos provider](DOCS_BASE_URL_PLACEHOLDER/concepts/authentication#_kerberos).
    /// The Kerberos AuthenticationClass is used when users should authenticate themselves via Kerberos.
    Kerberos(kerberos::AuthenticationProvider),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_to_string() {
        let tls_provider = AuthenticationClassProvider::Tls(tls::AuthenticationProvider {
            client_cert_secret_class: None,
        });
        assert_eq!("Tls", tls_provider.to_string());

        let kerberos_provider =
            AuthenticationClassProvider::Kerberos(kerberos::AuthenticationProvider {
                kerberos_secret_class: "kerberos".to_string(),
            });
        assert_eq!("Kerberos", kerberos_provider.to_string());
    }

    #[test]
    fn deserialize_static_provider() {
        let spec = serde_yaml::from_str::<AuthenticationClassSpec>(
            "
            provider:
              static:
                userCredentialsSecret:
                  name: nifi-admin-credentials
            ",
        )
        .unwrap();

        match spec.provider {
            AuthenticationClassProvider::Static(provider) => {
                assert_eq!(provider.user_credentials_secret.name, "nifi-admin-credentials");
            }
            other => panic!("expected a static provider, got {other}"),
        }
    }
}
