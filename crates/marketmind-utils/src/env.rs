//! Environment variable helpers

/// Read an environment variable, treating empty or whitespace values as unset
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a boolean flag (`1`, `true`, `yes`, `on`; case-insensitive)
pub fn env_flag(key: &str) -> bool {
    env_var(key).is_some_and(|value| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_var_is_none() {
        assert_eq!(env_var("MARKETMIND_TEST_SURELY_UNSET_VAR"), None);
        assert!(!env_flag("MARKETMIND_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_path_is_present() {
        // PATH is set in every sane test environment
        assert!(env_var("PATH").is_some());
    }
}
