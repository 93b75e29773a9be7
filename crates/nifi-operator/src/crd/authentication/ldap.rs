use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::commons::{secret_class::SecretClassVolume, tls_verification::TlsClientDetails};

#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationProvider {
    /// Host of the LDAP server, for example: `my.ldap.server` or `127.0.0.1`.
    pub hostname: String,

    /// Port of the LDAP server. If TLS is used defaults to 636 otherwise to 389.
    pub port: Option<u16>,

    /// LDAP search base, for example: `ou=users,dc=example,dc=org`.
    #[serde(default)]
    pub search_base: String,

    /// LDAP query to filter users, for example: `(memberOf=cn=myTeam,ou=teams,dc=example,dc=org)`.
    #[serde(default)]
    pub search_filter: String,

    /// The name of the LDAP object fields.
    #[serde(default)]
    pub ldap_field_names: FieldNames,

    /// In case you need a special account for searching the LDAP server you can specify it here.
    pub bind_credentials: Option<SecretClassVolume>,

    /// Use a TLS connection. If not specified no TLS will be used.
    #[serde(flatten)]
    pub tls: TlsClientDetails,
}

impl AuthenticationProvider {
    /// Returns the LDAP endpoint url.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{protocol}{server_hostname}:{server_port}",
            protocol = match self.tls.tls {
                None => "ldap://",
                Some(_) => "ldaps://",
            },
            server_hostname = self.hostname,
            server_port = self.port()
        )
    }

    /// Returns the port to be used, which is either user configured or defaulted based upon TLS usage
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.tls.uses_tls() { 636 } else { 389 })
    }

    pub fn has_bind_credentials(&self) -> bool {
        self.bind_credentials.is_some()
    }
}

#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct FieldNames {
    /// The name of the username field
    #[serde(default = "FieldNames::default_uid")]
    pub uid: String,

    /// The name of the group field
    #[serde(default = "FieldNames::default_group")]
    pub group: String,

    /// The name of the firstname field
    #[serde(default = "FieldNames::default_given_name")]
    pub given_name: String,

    /// The name of the lastname field
    #[serde(default = "FieldNames::default_surname")]
    pub surname: String,

    /// The name of the email field
    #[serde(default = "FieldNames::default_email")]
    pub email: String,
}

impl FieldNames {
    fn default_uid() -> String {
        "uid".to_string()
    }

    fn default_group() -> String {
        "memberof".to_string()
    }

    fn default_given_name() -> String {
        "givenName".to_string()
    }

    fn default_surname() -> String {
        "sn".to_string()
    }

    fn default_email() -> String {
        "mail".to_string()
    }
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            uid: Self::default_uid(),
            group: Self::default_group(),
            given_name: Self::default_given_name(),
            surname: Self::default_surname(),
            email: Self::default_email(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal() {
        let ldap = serde_yaml::from_str::<AuthenticationProvider>(
            "
            hostname: my.ldap.server
            ",
        )
        .unwrap();

        assert_eq!(ldap.port(), 389);
        assert!(!ldap.tls.uses_tls());
        assert_eq!(ldap.ldap_field_names.uid, "uid");
        assert_eq!(ldap.endpoint_url(), "ldap://my.ldap.server:389");
    }

    #[test]
    fn full() {
        let input = r#"
            hostname: my.ldap.server
            port: 42
            searchBase: ou=users,dc=example,dc=org
            bindCredentials:
              secretClass: openldap-bind-credentials
            tls:
              verification:
                server:
                  caCert:
                    secretClass: ldap-ca-cert
        "#;
        let deserializer = serde_yaml::Deserializer::from_str(input);
        let ldap: AuthenticationProvider =
            serde_yaml::with::singleton_map_recursive::deserialize(deserializer).unwrap();

        assert_eq!(ldap.port(), 42);
        assert!(ldap.tls.uses_tls());
        assert!(ldap.has_bind_credentials());
        assert_eq!(ldap.endpoint_url(), "ldaps://my.ldap.server:42");
    }
}
