use k8s_openapi::api::core::v1::{
    EnvVar, KeyToPath, SecretVolumeSource, Volume, VolumeMount,
};

use crate::{
    builder::volume::{VolumeBuilder, VolumeMountBuilder},
    config::{
        properties::{PropertiesFile, getenv_reference},
        xml::XmlElement,
    },
    constants::{NIFI_ADMIN_USERNAME, USER_MOUNT_DIR},
    crd::authentication::r#static,
    security::{
        Authenticator, NIFI_ADMIN_PASSWORD_ENV, Result, login_identity_providers_document,
    },
};

/// Authentication with a static admin user.
///
/// The admin password is mounted from the user-supplied credentials Secret
/// and bcrypt-hashed into `NIFI_ADMIN_PASSWORD` before NiFi starts, the
/// single-user login-identity-provider picks it up from the environment.
#[derive(Clone, Debug)]
pub struct StaticAuthenticator {
    pub provider: r#static::AuthenticationProvider,
}

impl StaticAuthenticator {
    fn admin_password_file() -> String {
        format!("{USER_MOUNT_DIR}/{NIFI_ADMIN_USERNAME}")
    }
}

impl Authenticator for StaticAuthenticator {
    fn env_vars(&self) -> Vec<EnvVar> {
        Vec::new()
    }

    fn volumes(&self) -> Vec<Volume> {
        vec![
            VolumeBuilder::new(NIFI_ADMIN_USERNAME)
                .secret(SecretVolumeSource {
                    secret_name: Some(self.provider.user_credentials_secret.name.clone()),
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
        Ok(None)
    }

    fn login_identity_provider_xml(&self) -> String {
        let mut provider = XmlElement::new("provider");
        provider
            .child_text("identifier", "login-identity-provider")
            .child_text(
                "class",
                "org.apache.nifi.authentication.single.user.SingleUserLoginIdentityProvider",
            )
            .property("Username", NIFI_ADMIN_USERNAME)
            .property("Password", getenv_reference(NIFI_ADMIN_PASSWORD_ENV));

        login_identity_providers_document(Some(provider))
    }

    fn init_args(&self) -> Option<String> {
        Some(format!(
            "export {NIFI_ADMIN_PASSWORD_ENV}=\"$(python3 -c 'import bcrypt; print(bcrypt.hashpw(open(\"{password_file}\", \"rb\").read().strip(), bcrypt.gensalt()).decode(\"utf-8\"), end=\"\")')\"",
            password_file = Self::admin_password_file(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> StaticAuthenticator {
        StaticAuthenticator {
            provider: serde_yaml::from_str(
                "
                userCredentialsSecret:
                  name: nifi-admin-credentials
                ",
            )
            .unwrap(),
        }
    }

    #[test]
    fn single_user_login_identity_provider() {
        let xml = authenticator().login_identity_provider_xml();

        assert!(xml.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"
        ));
        assert!(xml.contains(
            "org.apache.nifi.authentication.single.user.SingleUserLoginIdentityProvider"
        ));
        assert!(xml.contains("<property name=\"Username\">admin</property>"));
        assert!(xml.contains(
            "<property name=\"Password\">{{ getenv \"NIFI_ADMIN_PASSWORD\" }}</property>"
        ));
    }

    #[test]
    fn volume_references_the_user_credentials_secret() {
        let volumes = authenticator().volumes();
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0].secret.as_ref().unwrap().secret_name.as_deref(),
            Some("nifi-admin-credentials")
        );

        let mounts = authenticator().volume_mounts();
        assert_eq!(mounts[0].mount_path, "/stackable/users");
        assert_eq!(mounts[0].read_only, Some(true));
    }

    #[test]
    fn init_args_export_the_hashed_password() {
        let args = authenticator().init_args().unwrap();
        assert!(args.contains("export NIFI_ADMIN_PASSWORD="));
        assert!(args.contains("bcrypt.hashpw"));
    }
}
