use secrecy::{ExposeSecret, Secret};

/// An access token lifted from an `Authorization: Bearer <token>` header.
pub struct BearerToken(Secret<String>);

impl BearerToken {
    /// Parses the raw value of the `Authorization` header.
    pub fn parse(header_value: &str) -> Result<BearerToken, String> {
        let mut parts = header_value.trim().splitn(2, ' ');
        let scheme = parts.next().unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err("The authorization scheme was not 'Bearer'.".into());
        }
        let token = parts.next().unwrap_or_default().trim();
        if token.is_empty() {
            return Err("The bearer token was empty.".into());
        }
        if token.chars().any(char::is_whitespace) {
            return Err("The bearer token contains whitespace.".into());
        }
        Ok(Self(Secret::new(token.to_string())))
    }
}

impl ExposeSecret<String> for BearerToken {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}
