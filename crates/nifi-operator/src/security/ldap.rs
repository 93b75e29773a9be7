use k8s_openapi::api::core::v1::{EnvVar, Volume, VolumeMount};

use crate::{
    builder::volume::VolumeMountBuilder,
    config::{
        properties::{PropertiesFile, file_reference},
        xml::XmlElement,
    },
    constants::{
        DEFAULT_SERVER_TLS_KEY_PASSWORD, DEFAULT_SERVER_TLS_STORE_PASSWORD, SECRET_BASE_PATH,
        TLS_MOUNT_DIR,
    },
    crd::authentication::ldap,
    security::{Authenticator, Result, login_identity_providers_document},
};

/// Authentication against an external LDAP directory.
///
/// The bind credentials are mounted as files from a SecretClass-backed
/// volume, NiFi reads them through `${file:UTF-8:...}` references in the
/// login-identity-provider configuration.
#[derive(Clone, Debug)]
pub struct LdapAuthenticator {
    pub provider: ldap::AuthenticationProvider,
}

impl LdapAuthenticator {
    fn bind_credentials_volume_name(secret_class: &str) -> String {
        format!("{secret_class}-bind-credentials")
    }

    fn bind_credentials_mount_dir(secret_class: &str) -> String {
        format!("{SECRET_BASE_PATH}/{secret_class}")
    }

    /// Returns the paths of the files containing the bind user and password,
    /// `None` if the directory is searched anonymously.
    fn bind_credentials_mount_paths(&self) -> Option<(String, String)> {
        self.provider.bind_credentials.as_ref().map(|credentials| {
            let mount_dir = Self::bind_credentials_mount_dir(&credentials.secret_class);
            (format!("{mount_dir}/user"), format!("{mount_dir}/password"))
        })
    }

    fn authentication_strategy(&self) -> &'static str {
        if self.provider.has_bind_credentials() {
            if self.provider.tls.uses_tls_verification() {
                "LDAPS"
            } else {
                "SIMPLE"
            }
        } else {
            "ANONYMOUS"
        }
    }

    fn search_filter(&self) -> String {
        if self.provider.search_filter.is_empty() {
            // NiFi substitutes {0} with the login username
            format!("{uid}={{0}}", uid = self.provider.ldap_field_names.uid)
        } else {
            self.provider.search_filter.clone()
        }
    }
}

impl Authenticator for LdapAuthenticator {
    fn env_vars(&self) -> Vec<EnvVar> {
        Vec::new()
    }

    fn volumes(&self) -> Vec<Volume> {
        self.provider
            .bind_credentials
            .as_ref()
            .map(|credentials| {
                let volume_name = Self::bind_credentials_volume_name(&credentials.secret_class);
                vec![credentials.to_volume(&volume_name)]
            })
            .unwrap_or_default()
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        self.provider
            .bind_credentials
            .as_ref()
            .map(|credentials| {
                let secret_class = &credentials.secret_class;
                vec![
                    VolumeMountBuilder::new(
                        Self::bind_credentials_volume_name(secret_class),
                        Self::bind_credentials_mount_dir(secret_class),
                    )
                    .build(),
                ]
            })
            .unwrap_or_default()
    }

    fn extend_properties(&self) -> Result<Option<PropertiesFile>> {
        Ok(None)
    }

    fn login_identity_provider_xml(&self) -> String {
        let (manager_dn, manager_password) = match self.bind_credentials_mount_paths() {
            Some((user_file, password_file)) => {
                (file_reference(user_file), file_reference(password_file))
            }
            None => (String::new(), String::new()),
        };

        let mut provider = XmlElement::new("provider");
        provider
            .child_text("identifier", "login-identity-provider")
            .child_text("class", "org.apache.nifi.ldap.LdapProvider")
            .property("Authentication Strategy", self.authentication_strategy())
            .property("Manager DN", manager_dn)
            .property("Manager Password", manager_password)
            .property("Referral Strategy", "THROW")
            .property("Connect Timeout", "10 secs")
            .property("Read Timeout", "10 secs")
            .property("Url", self.provider.endpoint_url())
            .property("User Search Base", &self.provider.search_base)
            .property("User Search Filter", self.search_filter())
            .property("TLS - Client Auth", "NONE")
            .property("TLS - Keystore", format!("{TLS_MOUNT_DIR}/ldap/keystore.p12"))
            .property("TLS - Keystore Password", DEFAULT_SERVER_TLS_KEY_PASSWORD)
            .property("TLS - Keystore Type", "PKCS12")
            .property(
                "TLS - Truststore",
                format!("{TLS_MOUNT_DIR}/ldap/truststore.p12"),
            )
            .property(
                "TLS - Truststore Password",
                DEFAULT_SERVER_TLS_STORE_PASSWORD,
            )
            .property("TLS - Truststore Type", "PKCS12")
            .property("TLS - Protocol", "TLSv1.2")
            .property("TLS - Shutdown Gracefully", "true")
            .property("Identity Strategy", "USE_DN")
            .property("Authentication Expiration", "7 days");

        login_identity_providers_document(Some(provider))
    }

    fn init_args(&self) -> Option<String> {
        None
    }
}
