use anyhow::{Context, Result};

/// Key used to index per-host policy entries.
///
/// We intentionally normalise URLs down to `(scheme, host, port)` so that
/// different paths on the same origin share policy (range support, throttling,
/// and recommended segment limits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl HostKey {
    /// Construct a host key from a URL string.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(url).with_context(|| format!("invalid URL for host policy: {url}"))?;

        let scheme = parsed.scheme().to_string();
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("URL missing host for host policy: {url}"))?
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("URL missing port and unknown default: {url}"))?;

        Ok(Self {
            scheme,
            host,
            port,
        })
    }

    /// Encode as a flat `"scheme:host:port"` string for use as a JSON map key.
    pub fn to_string_key(&self) -> String {
        format!("{}:{}:{}", self.scheme, self.host, self.port)
    }

    /// Parse the format produced by `to_string_key`. Returns `None` on malformed input
    /// rather than erroring, since a corrupt persisted entry should just be dropped.
    pub fn from_string_key(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        let scheme = parts.next()?.to_string();
        let host = parts.next()?.to_string();
        let port: u16 = parts.next()?.parse().ok()?;
        Some(Self { scheme, host, port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_key_roundtrip() {
        let key = HostKey {
            scheme: "https".to_string(),
            host: "example.com".to_string(),
            port: 443,
        };
        let s = key.to_string_key();
        assert_eq!(s, "https:example.com:443");
        assert_eq!(HostKey::from_string_key(&s), Some(key));
    }

    #[test]
    fn from_string_key_rejects_malformed() {
        assert_eq!(HostKey::from_string_key("nope"), None);
        assert_eq!(HostKey::from_string_key("https:host:notaport"), None);
    }
}

