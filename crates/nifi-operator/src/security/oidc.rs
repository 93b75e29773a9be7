use k8s_openapi::api::core::v1::{
    EnvVar, EnvVarSource, KeyToPath, SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};
use snafu::ResultExt;

use crate::{
    builder::volume::{VolumeBuilder, VolumeMountBuilder},
    config::properties::{PropertiesFile, getenv_reference},
    constants::{NIFI_ADMIN_USERNAME, USER_MOUNT_DIR},
    crd::authentication::oidc::{
        self, CLIENT_ID_SECRET_KEY, CLIENT_SECRET_SECRET_KEY, ClientAuthenticationOptions,
    },
    security::{
        Authenticator, BuildOidcDiscoveryUrlSnafu, NIFI_ADMIN_PASSWORD_ENV, Result, admin_secret,
        login_identity_providers_document,
    },
};

pub const OIDC_CLIENT_ID_ENV: &str = "OIDC_CLIENT_ID";
pub const OIDC_CLIENT_SECRET_ENV: &str = "OIDC_CLIENT_SECRET";

/// Authentication against an OpenID Connect identity provider.
///
/// OIDC is configured entirely through `nifi.properties`, the
/// login-identity-provider document stays empty. The client credentials are
/// injected as environment variables backed by the client-credentials
/// Secret.
#[derive(Clone, Debug)]
pub struct OidcAuthenticator {
    pub cluster_name: String,
    pub options: ClientAuthenticationOptions,
    pub provider: oidc::AuthenticationProvider,
}

impl OidcAuthenticator {
    fn admin_password_file() -> String {
        format!("{USER_MOUNT_DIR}/{NIFI_ADMIN_USERNAME}")
    }
}

impl Authenticator for OidcAuthenticator {
    fn env_vars(&self) -> Vec<EnvVar> {
        let secret_key_env = |name: &str, key: &str| EnvVar {
            name: name.to_owned(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    key: key.to_owned(),
                    name: self.options.client_credentials_secret_ref.clone(),
                    ..SecretKeySelector::default()
                }),
                ..EnvVarSource::default()
            }),
            ..EnvVar::default()
        };

        vec![
            secret_key_env(OIDC_CLIENT_ID_ENV, CLIENT_ID_SECRET_KEY),
            secret_key_env(OIDC_CLIENT_SECRET_ENV, CLIENT_SECRET_SECRET_KEY),
        ]
    }

    fn volumes(&self) -> Vec<Volume> {
        vec![
            VolumeBuilder::new(NIFI_ADMIN_USERNAME)
                .secret(SecretVolumeSource {
                    secret_name: Some(admin_secret::admin_password_secret_name(
                        &self.cluster_name,
                    )),
                    items: Some(vec![KeyToPath {
                        key: NIFI_ADMIN_USERNAME.to_owned(),
                        path: NIFI_ADMIN_USERNAME.to_owned(),
                        ..KeyToPath::default()
                    }]),
                    ..SecretVolumeSource::default()
                })
                .build(),
        ]
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        vec![
            VolumeMountBuilder::new(NIFI_ADMIN_USERNAME, USER_MOUNT_DIR)
                .read_only(true)
                .build(),
        ]
    }

    fn extend_properties(&self) -> Result<Option<PropertiesFile>> {
        let discovery_url = self
            .provider
            .discovery_url()
            .context(BuildOidcDiscoveryUrlSnafu)?;

        let scopes = self
            .provider
            .scopes
            .iter()
            .chain(&self.options.extra_scopes)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut properties = PropertiesFile::new();
        properties
            .add("nifi.security.user.oidc.discovery.url", discovery_url.as_str())
            .add(
                "nifi.security.user.oidc.client.id",
                getenv_reference(OIDC_CLIENT_ID_ENV),
            )
            .add(
                "nifi.security.user.oidc.client.secret",
                getenv_reference(OIDC_CLIENT_SECRET_ENV),
            )
            .add("nifi.security.user.oidc.extra.scopes", scopes)
            .add(
                "nifi.security.user.oidc.claim.identifying.user",
                self.provider.principal_claim.as_str(),
            );

        Ok(Some(properties))
    }

    fn login_identity_provider_xml(&self) -> String {
        // OIDC is not expressed through the login-identity-provider
        // configuration, only the envelope is rendered.
        login_identity_providers_document(None)
    }

    fn init_args(&self) -> Option<String> {
        Some(format!(
            "export {NIFI_ADMIN_PASSWORD_ENV}=\"$(cat {password_file} | htpasswd -niB {NIFI_ADMIN_USERNAME} | cut -d: -f2)\"",
            password_file = Self::admin_password_file(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator(port: Option<u16>, extra_scopes: Vec<String>) -> OidcAuthenticator {
        OidcAuthenticator {
            cluster_name: "simple-nifi".to_owned(),
            options: ClientAuthenticationOptions {
                client_credentials_secret_ref: "nifi-oidc-client".to_owned(),
                extra_scopes,
            },
            provider: serde_yaml::from_str(&format!(
                "
                hostname: idp.example.com
                {port_line}
                rootPath: /realm
                scopes: [openid, email]
                principalClaim: preferred_username
                ",
                port_line = port.map(|p| format!("port: {p}")).unwrap_or_default(),
            ))
            .unwrap(),
        }
    }

    #[test]
    fn env_vars_reference_the_client_credentials_secret() {
        let env_vars = authenticator(None, Vec::new()).env_vars();

        let names = env_vars.iter().map(|env| env.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["OIDC_CLIENT_ID", "OIDC_CLIENT_SECRET"]);

        for env in env_vars {
            let secret_key_ref = env.value_from.unwrap().secret_key_ref.unwrap();
            assert_eq!(secret_key_ref.name, "nifi-oidc-client");
            assert!(env.value.is_none());
        }
    }

    #[test]
    fn discovery_url_without_port() {
        let properties = authenticator(None, Vec::new())
            .extend_properties()
            .unwrap()
            .unwrap();
        assert_eq!(
            properties.get("nifi.security.user.oidc.discovery.url"),
            Some("http://idp.example.com/realm")
        );
    }

    #[test]
    fn discovery_url_with_port() {
        let properties = authenticator(Some(8080), Vec::new())
            .extend_properties()
            .unwrap()
            .unwrap();
        assert_eq!(
            properties.get("nifi.security.user.oidc.discovery.url"),
            Some("http://idp.example.com:8080/realm")
        );
    }

    #[test]
    fn scopes_are_joined_in_order() {
        let properties = authenticator(None, vec!["groups".to_owned()])
            .extend_properties()
            .unwrap()
            .unwrap();
        assert_eq!(
            properties.get("nifi.security.user.oidc.extra.scopes"),
            Some("openid,email,groups")
        );
        assert_eq!(
            properties.get("nifi.security.user.oidc.client.id"),
            Some("{{ getenv \"OIDC_CLIENT_ID\" }}")
        );
    }

    #[test]
    fn empty_login_identity_provider_envelope() {
        let xml = authenticator(None, Vec::new()).login_identity_provider_xml();
        assert!(xml.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"
        ));
        assert!(!xml.contains("<provider>"));
    }

    #[test]
    fn init_args_hash_the_mounted_password() {
        let args = authenticator(None, Vec::new()).init_args().unwrap();
        assert!(args.contains("/stackable/users/admin"));
        assert!(args.contains("export NIFI_ADMIN_PASSWORD="));
    }
}
