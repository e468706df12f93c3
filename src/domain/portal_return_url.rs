use reqwest::Url;

/// Where Stripe's billing portal sends the user back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalReturnUrl(String);

impl PortalReturnUrl {
    /// Picks the first usable origin among the `Origin` header, the origin of
    /// the `Referer` header and `fallback_origin`, then appends `path`.
    pub fn derive(
        origin: Option<&str>,
        referer: Option<&str>,
        fallback_origin: &str,
        path: &str,
    ) -> PortalReturnUrl {
        let base = origin
            .and_then(origin_of)
            .or_else(|| referer.and_then(origin_of))
            .unwrap_or_else(|| fallback_origin.trim_end_matches('/').to_string());
        let path = path.trim_start_matches('/');
        Self(format!("{}/{}", base, path))
    }
}

fn origin_of(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.origin().ascii_serialization()),
        _ => None,
    }
}

impl AsRef<str> for PortalReturnUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
