use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::commons::tls_verification::TlsClientDetails;

/// Key inside the client-credentials Secret holding the client id.
pub const CLIENT_ID_SECRET_KEY: &str = "CLIENT_ID";
/// Key inside the client-credentials Secret holding the client secret.
pub const CLIENT_SECRET_SECRET_KEY: &str = "CLIENT_SECRET";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse OIDC endpoint url"))]
    ParseOidcEndpointUrl { source: url::ParseError },
}

/// This struct contains configuration values to configure an OpenID Connect
/// (OIDC) authentication class. Required fields are the identity provider
/// (IdP) `hostname` and the TLS configuration. The `port` is selected
/// automatically if not configured otherwise. The `rootPath` defaults
/// to `/`.
#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationProvider {
    /// Host of the identity provider, e.g. `my.keycloak.corp` or `127.0.0.1`.
    pub hostname: String,

    /// Port of the identity provider. If not configured, no port is appended
    /// to the discovery URL.
    pub port: Option<u16>,

    /// Root HTTP path of the identity provider. Defaults to `/`.
    #[serde(default = "AuthenticationProvider::default_root_path")]
    pub root_path: String,

    /// Use a TLS connection. If not specified no TLS will be used.
    #[serde(flatten)]
    pub tls: TlsClientDetails,

    /// If a product extracts some sort of "effective user" that is represented by a
    /// string internally, this config determines with claim is used to extract that
    /// string. It is desirable to use `sub` in here (or some other stable identifier),
    /// but in many cases you might need to use `preferred_username` (e.g. in case of Keycloak)
    /// or a different claim instead.
    pub principal_claim: String,

    /// Scopes to request from your identity provider. It is recommended to
    /// request the `openid`, `email`, and `profile` scopes.
    pub scopes: Vec<String>,
}

impl AuthenticationProvider {
    /// Returns the OIDC discovery [`Url`] without a trailing slash.
    ///
    /// The url is composed of the `http` scheme, the IdP host, the port (only
    /// if one is configured) and the root path.
    //
    // TODO: honor the IdP TLS settings once the runtime can trust a custom CA
    // for the discovery endpoint.
    pub fn discovery_url(&self) -> Result<Url> {
        let authority = match self.port {
            Some(port) => format!("{hostname}:{port}", hostname = self.hostname),
            None => self.hostname.clone(),
        };

        // Some tools can not cope with a trailing slash, so let's remove that
        let root_path = self.root_path.trim_end_matches('/');

        Url::parse(&format!("http://{authority}{root_path}")).context(ParseOidcEndpointUrlSnafu)
    }

    fn default_root_path() -> String {
        "/".to_string()
    }
}

/// OIDC specific config options. These are set on the product config level.
#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ClientAuthenticationOptions {
    /// A reference to the OIDC client credentials secret. The secret contains
    /// the client id and secret.
    #[serde(rename = "clientCredentialsSecret")]
    pub client_credentials_secret_ref: String,

    /// An optional list of extra scopes which get merged with the scopes
    /// defined in the AuthenticationClass.
    #[serde(default)]
    pub extra_scopes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn minimal() {
        let oidc = serde_yaml::from_str::<AuthenticationProvider>(
            "
            hostname: my.keycloak.server
            scopes: [openid]
            principalClaim: preferred_username
            ",
        )
        .unwrap();

        assert_eq!(oidc.root_path, "/");
        assert_eq!(
            oidc.discovery_url().unwrap().as_str(),
            "http://my.keycloak.server/"
        );
    }

    #[rstest]
    #[case(None, "/realm", "http://idp.example.com/realm")]
    #[case(Some(8080), "/realm", "http://idp.example.com:8080/realm")]
    #[case(Some(8080), "/realms/sdp/", "http://idp.example.com:8080/realms/sdp")]
    fn discovery_url_composition(
        #[case] port: Option<u16>,
        #[case] root_path: &str,
        #[case] expected: &str,
    ) {
        let oidc = AuthenticationProvider {
            hostname: "idp.example.com".to_string(),
            port,
            root_path: root_path.to_string(),
            tls: TlsClientDetails { tls: None },
            principal_claim: "preferred_username".to_string(),
            scopes: vec!["openid".to_string()],
        };

        assert_eq!(oidc.discovery_url().unwrap().as_str(), expected);
    }
}
