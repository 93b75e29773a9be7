use std::{borrow::Cow, fmt::Display, ops::Deref, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(display("failed to parse {input:?} as a duration"))]
pub struct DurationParseError {
    source: humantime::DurationError,
    input: String,
}

/// A duration with a human-readable serialized form, e.g. `30s` or `2m`.
///
/// This is the format users configure timeouts in, for example the
/// graceful-shutdown timeout of a role group.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration(std::time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }
}

impl JsonSchema for Duration {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("Duration")
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        String::json_schema(generator)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let duration = humantime::parse_duration(input).context(DurationParseSnafu { input })?;
        Ok(Self(duration))
    }
}

impl TryFrom<String> for Duration {
    type Error = DurationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Duration> for String {
    fn from(value: Duration) -> Self {
        value.to_string()
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        humantime::format_duration(self.0).fmt(f)
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("30s", 30)]
    #[case("2m", 120)]
    #[case("1h", 3600)]
    fn parse(#[case] input: &str, #[case] expected_secs: u64) {
        let duration = input.parse::<Duration>().unwrap();
        assert_eq!(duration.as_secs(), expected_secs);
    }

    #[test]
    fn parse_garbage() {
        assert!("a while".parse::<Duration>().is_err());
    }

    #[test]
    fn roundtrip_through_serde() {
        let duration: Duration = serde_yaml::from_str("30s").unwrap();
        assert_eq!(duration, Duration::from_secs(30));
        assert_eq!(serde_yaml::to_string(&duration).unwrap().trim(), "30s");
    }
}
