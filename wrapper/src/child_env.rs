//! Construction of the child process environment.
//!
//! The server child never inherits the wrapper's environment wholesale: the
//! required credential variables come first, then a fixed allow-list of
//! parent variables needed for basic runtime behaviour and enterprise proxy
//! setups. Anything else from the parent environment is dropped. Values are
//! validated before use because NUL bytes or line breaks could forge
//! additional environment entries on some platforms.

use crate::error::{Result, WrapperError};

/// Parent environment variables forwarded to the child when set.
const ALLOWED_PARENT_ENV_KEYS: &[&str] = &[
    // Basic runtime environment.
    "PATH",
    "HOME",
    "USERPROFILE",
    "TMPDIR",
    "TMP",
    "TEMP",
    "SHELL",
    "COMSPEC",
    "SYSTEMROOT",
    "WINDIR",
    // Proxy/certificate environment for enterprise networks.
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
    "all_proxy",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
];

/// Build the child environment from required key/value pairs and the
/// allow-listed subset of the parent environment.
///
/// Required pairs come first and override colliding parent values; parent
/// variables outside the allow-list never appear. Insertion order is
/// preserved and duplicate required keys keep their first value.
#[must_use]
pub fn build_child_env(required: &[(String, String)]) -> Vec<(String, String)> {
    let mut env = Vec::with_capacity(required.len() + ALLOWED_PARENT_ENV_KEYS.len());

    for (key, value) in required {
        if key.is_empty() || contains_key(&env, key) {
            continue;
        }
        env.push((key.clone(), value.clone()));
    }

    for key in ALLOWED_PARENT_ENV_KEYS {
        if contains_key(&env, key) {
            continue;
        }
        if let Ok(value) = std::env::var(key) {
            env.push(((*key).to_owned(), value));
        }
    }

    env
}

/// Reject values that could forge additional environment entries.
///
/// Credential values are opaque strings from an external collaborator; a NUL
/// byte or line break must fail loudly rather than be truncated silently.
///
/// # Errors
///
/// Returns [`WrapperError::InvalidEnvValue`] naming the offending key.
pub fn validate_env_value(key: &str, value: &str) -> Result<()> {
    if value.contains(['\0', '\n', '\r']) {
        return Err(WrapperError::InvalidEnvValue {
            key: key.to_owned(),
        });
    }

    Ok(())
}

fn contains_key(env: &[(String, String)], key: &str) -> bool {
    env.iter().any(|(existing, _)| existing == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn required_pairs_come_first_in_order() {
        let env = temp_env::with_vars_unset(ALLOWED_PARENT_ENV_KEYS, || {
            build_child_env(&[
                pair("GITHUB_PERSONAL_ACCESS_TOKEN", "token"),
                pair("GITHUB_HOST", "https://github.com"),
            ])
        });
        assert_eq!(
            env,
            vec![
                pair("GITHUB_PERSONAL_ACCESS_TOKEN", "token"),
                pair("GITHUB_HOST", "https://github.com"),
            ]
        );
    }

    #[test]
    fn required_pairs_override_colliding_parent_values() {
        let env = temp_env::with_var("PATH", Some("/parent/bin"), || {
            build_child_env(&[pair("PATH", "/required/bin")])
        });
        let path_values: Vec<&str> = env
            .iter()
            .filter(|(key, _)| key == "PATH")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(path_values, vec!["/required/bin"]);
    }

    #[test]
    fn allow_listed_parent_variables_are_forwarded() {
        let env = temp_env::with_var("HTTPS_PROXY", Some("http://proxy:3128"), || {
            build_child_env(&[])
        });
        assert!(env.contains(&pair("HTTPS_PROXY", "http://proxy:3128")));
    }

    #[test]
    fn non_allow_listed_parent_variables_never_appear() {
        let env = temp_env::with_var("GH_MCP_SECRET_LEAK", Some("oops"), || {
            build_child_env(&[])
        });
        assert!(!env.iter().any(|(key, _)| key == "GH_MCP_SECRET_LEAK"));
    }

    #[test]
    fn duplicate_required_keys_keep_first_value() {
        let env = build_child_env(&[pair("GITHUB_HOST", "first"), pair("GITHUB_HOST", "second")]);
        let hosts: Vec<&str> = env
            .iter()
            .filter(|(key, _)| key == "GITHUB_HOST")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(hosts, vec!["first"]);
    }

    #[test]
    fn empty_required_keys_are_skipped() {
        let env = temp_env::with_vars_unset(["PATH", "HOME"], || {
            build_child_env(&[pair("", "value")])
        });
        assert!(env.is_empty() || env.iter().all(|(key, _)| !key.is_empty()));
    }

    #[rstest]
    #[case::nul("tok\0en")]
    #[case::newline("tok\nen")]
    #[case::carriage_return("tok\ren")]
    fn rejects_values_with_forging_bytes(#[case] value: &str) {
        let err = validate_env_value("GITHUB_PERSONAL_ACCESS_TOKEN", value)
            .expect_err("expected rejection");
        assert!(matches!(
            err,
            WrapperError::InvalidEnvValue { ref key } if key == "GITHUB_PERSONAL_ACCESS_TOKEN"
        ));
    }

    #[test]
    fn accepts_ordinary_values() {
        assert!(validate_env_value("GITHUB_HOST", "https://github.com").is_ok());
    }
}
