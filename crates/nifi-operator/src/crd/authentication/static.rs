use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationProvider {
    /// Secret providing the usernames and passwords of the users.
    pub user_credentials_secret: UserCredentialsSecretRef,
}

#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct UserCredentialsSecretRef {
    /// Name of the Secret.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize() {
        let provider = serde_yaml::from_str::<AuthenticationProvider>(
            "
            userCredentialsSecret:
              name: nifi-users
            ",
        )
        .unwrap();

        assert_eq!(provider.user_credentials_secret.name, "nifi-users");
    }
}
