//! Credential resolution for the wrapped server.
//!
//! The wrapper does not implement authentication itself; it asks a
//! [`CredentialSource`] for the host and token and validates the answers.
//! The system implementation follows the `gh` CLI environment conventions,
//! which keeps behaviour predictable for users who already drive `gh` from
//! scripts.

use crate::error::{Result, WrapperError};

/// Host used when the credential source does not name one.
pub const DEFAULT_GITHUB_HOST: &str = "github.com";

/// Where the wrapper obtains the active host and its token.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialSource {
    /// The host the user is operating against, if one is configured.
    fn default_host(&self) -> Option<String>;

    /// The token for `host`, if the user is logged in there.
    fn token_for_host(&self, host: &str) -> Option<String>;
}

/// Credential source backed by the `gh` CLI environment variables:
/// `GH_HOST` for the host, `GH_TOKEN` falling back to `GITHUB_TOKEN` for
/// the token.
#[derive(Debug, Default)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn default_host(&self) -> Option<String> {
        non_empty_env("GH_HOST")
    }

    fn token_for_host(&self, _host: &str) -> Option<String> {
        non_empty_env("GH_TOKEN").or_else(|| non_empty_env("GITHUB_TOKEN"))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Resolved host URL and token, ready to become child environment entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Host as an `https://` URL.
    pub host_url: String,
    /// Opaque token for that host.
    pub token: String,
}

/// Resolve the active host and token from `source`.
///
/// A missing host falls back to [`DEFAULT_GITHUB_HOST`]; a host that is
/// present but empty is rejected rather than silently defaulted. The host
/// is normalized to an `https://` URL unless it already carries a scheme.
///
/// # Errors
///
/// Returns [`WrapperError::NoHost`] for an empty configured host and
/// [`WrapperError::NotLoggedIn`] when no token exists for the host.
pub fn resolve_credentials(source: &dyn CredentialSource) -> Result<Credentials> {
    let host = match source.default_host() {
        Some(host) if host.is_empty() => return Err(WrapperError::NoHost),
        Some(host) => host,
        None => DEFAULT_GITHUB_HOST.to_owned(),
    };

    let token = source
        .token_for_host(&host)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| WrapperError::NotLoggedIn { host: host.clone() })?;

    Ok(Credentials {
        host_url: normalize_host_url(&host),
        token,
    })
}

/// Prefix `https://` unless the host already names a scheme.
fn normalize_host_url(host: &str) -> String {
    if host.starts_with("https://") || host.starts_with("http://") {
        return host.to_owned();
    }

    format!("https://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn resolves_default_host_and_token() {
        let mut source = MockCredentialSource::new();
        source.expect_default_host().return_const(None);
        source
            .expect_token_for_host()
            .withf(|host| host == DEFAULT_GITHUB_HOST)
            .return_const(Some("ghp_token".to_owned()));

        let credentials = resolve_credentials(&source).expect("resolve");
        assert_eq!(
            credentials,
            Credentials {
                host_url: "https://github.com".to_owned(),
                token: "ghp_token".to_owned(),
            }
        );
    }

    #[test]
    fn configured_host_is_used_for_token_lookup() {
        let mut source = MockCredentialSource::new();
        source
            .expect_default_host()
            .return_const(Some("ghe.example.com".to_owned()));
        source
            .expect_token_for_host()
            .withf(|host| host == "ghe.example.com")
            .return_const(Some("ghe_token".to_owned()));

        let credentials = resolve_credentials(&source).expect("resolve");
        assert_eq!(credentials.host_url, "https://ghe.example.com");
    }

    #[test]
    fn empty_host_is_rejected() {
        let mut source = MockCredentialSource::new();
        source.expect_default_host().return_const(Some(String::new()));

        let err = resolve_credentials(&source).expect_err("empty host");
        assert!(matches!(err, WrapperError::NoHost));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(String::new()))]
    fn missing_token_reports_not_logged_in(#[case] token: Option<String>) {
        let mut source = MockCredentialSource::new();
        source.expect_default_host().return_const(None);
        source.expect_token_for_host().return_const(token);

        let err = resolve_credentials(&source).expect_err("no token");
        assert!(matches!(
            err,
            WrapperError::NotLoggedIn { ref host } if host == DEFAULT_GITHUB_HOST
        ));
    }

    #[rstest]
    #[case::bare("ghe.example.com", "https://ghe.example.com")]
    #[case::https("https://ghe.example.com", "https://ghe.example.com")]
    #[case::http("http://ghe.example.com", "http://ghe.example.com")]
    fn host_url_normalization(#[case] host: &str, #[case] expected: &str) {
        assert_eq!(normalize_host_url(host), expected);
    }

    #[test]
    fn env_source_prefers_gh_token() {
        let token = temp_env::with_vars(
            [
                ("GH_TOKEN", Some("primary")),
                ("GITHUB_TOKEN", Some("fallback")),
            ],
            || EnvCredentialSource.token_for_host(DEFAULT_GITHUB_HOST),
        );
        assert_eq!(token.as_deref(), Some("primary"));
    }

    #[test]
    fn env_source_falls_back_to_github_token() {
        let token = temp_env::with_vars(
            [("GH_TOKEN", None), ("GITHUB_TOKEN", Some("fallback"))],
            || EnvCredentialSource.token_for_host(DEFAULT_GITHUB_HOST),
        );
        assert_eq!(token.as_deref(), Some("fallback"));
    }

    #[test]
    fn env_source_treats_empty_host_as_unset() {
        let host = temp_env::with_var("GH_HOST", Some(""), || EnvCredentialSource.default_host());
        assert_eq!(host, None);
    }
}
