//! Serde helpers for loosely typed plugin options.

/// Deserialization of a port given either as a JSON number or a numeric string.
pub mod port {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawPort>::deserialize(deserializer)?;
        let value = match raw {
            None => return Ok(None),
            Some(RawPort::Number(n)) => n,
            Some(RawPort::Text(s)) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| D::Error::custom(format!("invalid port '{}'", s)))?,
        };
        u16::try_from(value)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port {} out of range", value)))
    }
}
