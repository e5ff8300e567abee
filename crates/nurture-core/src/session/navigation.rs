// ── Navigation target ──
//
// The resolver reads (never writes) where the user arrived: the path and
// any recovery markers in the query string or fragment. Recovery links
// put their parameters in either place depending on the auth flow.

use url::Url;

/// Path a password-reset link lands on.
pub const RECOVERY_PATH: &str = "/reset-password";

/// Parameters that carry the credential of a recovery flow.
const RECOVERY_TOKEN_PARAMS: &[&str] = &["access_token", "token_hash", "token", "code"];

/// Where the session is being opened from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    path: String,
    params: Vec<(String, String)>,
}

impl Navigation {
    /// No deep link: a plain start.
    pub fn none() -> Self {
        Self {
            path: "/".into(),
            params: Vec::new(),
        }
    }

    /// Parse an absolute URL or a bare path (`/reset-password?type=...`).
    ///
    /// Unparseable input is treated as a plain start.
    pub fn parse(target: &str) -> Self {
        let target = target.trim();
        if target.is_empty() {
            return Self::none();
        }
        let url = Url::parse(target).or_else(|_| {
            let base = Url::parse("http://localhost/")?;
            base.join(target)
        });
        match url {
            Ok(url) => Self::from_url(&url),
            Err(_) => Self::none(),
        }
    }

    pub fn from_url(url: &Url) -> Self {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if let Some(fragment) = url.fragment() {
            params.extend(
                url::form_urlencoded::parse(fragment.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
        }
        Self {
            path: url.path().to_owned(),
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of a query or fragment parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The recovery credential carried by the link, if any.
    pub fn recovery_token(&self) -> Option<&str> {
        RECOVERY_TOKEN_PARAMS
            .iter()
            .find_map(|name| self.param(name).filter(|v| !v.is_empty()))
    }

    /// The recovery path itself, or a `type=recovery` marker together
    /// with a token parameter.
    pub fn is_recovery(&self) -> bool {
        if self.path.trim_end_matches('/') == RECOVERY_PATH {
            return true;
        }
        self.param("type") == Some("recovery") && self.recovery_token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_path_alone_is_recovery() {
        assert!(Navigation::parse("/reset-password").is_recovery());
        assert!(Navigation::parse("https://app.example.com/reset-password/").is_recovery());
    }

    #[test]
    fn recovery_marker_needs_a_token() {
        assert!(!Navigation::parse("/?type=recovery").is_recovery());
        assert!(Navigation::parse("/?type=recovery&token_hash=abc").is_recovery());
        assert!(!Navigation::parse("/?type=recovery&token=").is_recovery());
    }

    #[test]
    fn fragment_parameters_are_read() {
        let nav = Navigation::parse(
            "https://app.example.com/#access_token=jwt&refresh_token=r&type=recovery",
        );
        assert!(nav.is_recovery());
        assert_eq!(nav.recovery_token(), Some("jwt"));
    }

    #[test]
    fn other_types_are_not_recovery() {
        assert!(!Navigation::parse("/?type=signup&token=abc").is_recovery());
        assert!(!Navigation::parse("/dashboard").is_recovery());
        assert!(!Navigation::none().is_recovery());
        assert!(!Navigation::parse("").is_recovery());
    }
}
