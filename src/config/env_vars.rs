use std::env;

/// Expand Unix-style environment variables in `value`.
///
/// Supports `${VAR}`, `${VAR:-default}` and `$VAR`. An unset `${VAR}`
/// expands to the empty string (or the default); an unset `$VAR` is left
/// as written. Expanded text is not scanned again.
pub fn expand_env_vars(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    let expr = &braced[..end];
                    let (name, default) = match expr.split_once(":-") {
                        Some((name, default)) => (name, Some(default)),
                        None => (expr, None),
                    };
                    match env::var(name) {
                        Ok(var_value) if !var_value.is_empty() || default.is_none() => {
                            result.push_str(&var_value)
                        }
                        _ => result.push_str(default.unwrap_or("")),
                    }
                    rest = &braced[end + 1..];
                }
                None => {
                    // No closing brace, keep the remainder verbatim
                    result.push_str(&rest[pos..]);
                    rest = "";
                }
            }
            continue;
        }

        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        match env::var(name) {
            Ok(var_value) if !name.is_empty() => result.push_str(&var_value),
            _ => {
                result.push('$');
                result.push_str(name);
            }
        }
        rest = &after[name_len..];
    }

    result.push_str(rest);
    result
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

/// Expand environment variables, then a leading `~/`.
pub fn expand_all(value: &str) -> String {
    expand_home(&expand_env_vars(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_dollar_style() {
        env::set_var("SFTP_PUT_TEST_USER", "tester");

        assert_eq!(expand_env_vars("$SFTP_PUT_TEST_USER"), "tester");
        assert_eq!(
            expand_env_vars("/home/$SFTP_PUT_TEST_USER/upload"),
            "/home/tester/upload"
        );
        assert_eq!(expand_env_vars("$SFTP_PUT_TEST_USER-key"), "tester-key");

        env::remove_var("SFTP_PUT_TEST_USER");
    }

    #[test]
    fn test_expand_brace_style() {
        env::set_var("SFTP_PUT_TEST_HOST", "files.example.com");

        assert_eq!(expand_env_vars("${SFTP_PUT_TEST_HOST}"), "files.example.com");
        assert_eq!(
            expand_env_vars("sftp://${SFTP_PUT_TEST_HOST}:22"),
            "sftp://files.example.com:22"
        );

        env::remove_var("SFTP_PUT_TEST_HOST");
    }

    #[test]
    fn test_unset_variables() {
        assert_eq!(expand_env_vars("${SFTP_PUT_TEST_UNSET}"), "");
        assert_eq!(expand_env_vars("${SFTP_PUT_TEST_UNSET:-fallback}"), "fallback");
        assert_eq!(expand_env_vars("$SFTP_PUT_TEST_UNSET/x"), "$SFTP_PUT_TEST_UNSET/x");
    }

    #[test]
    fn test_malformed_and_literal_dollars() {
        assert_eq!(expand_env_vars("${INCOMPLETE"), "${INCOMPLETE");
        assert_eq!(expand_env_vars("cost: 5$"), "cost: 5$");
        assert_eq!(expand_env_vars("$ alone"), "$ alone");
        assert_eq!(expand_env_vars("no variables"), "no variables");
    }

    #[test]
    fn test_expand_home() {
        if let Ok(home) = env::var("HOME") {
            let expanded = expand_home("~/.ssh/id_ed25519");
            assert!(expanded.starts_with(home.trim_end_matches('/')));
            assert!(expanded.ends_with("/.ssh/id_ed25519"));
        }
        assert_eq!(expand_home("/etc/hosts"), "/etc/hosts");
        assert_eq!(expand_home("~user/x"), "~user/x");
    }
}
