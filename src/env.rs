//! Helpers for reading configuration from environment variables.

/// Interpret a string value such as "1" or "no" as a boolean.
///
/// Returns `None` if the value is not recognized.
pub fn str_as_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Return whether a feature flag controlled by an environment variable is
/// enabled.
///
/// Unset variables and unrecognized values fall back to `default`.
pub fn env_flag(name: &str, default: bool) -> bool {
    let Ok(value) = std::env::var(name) else {
        return default;
    };
    str_as_bool(&value).unwrap_or_else(|| {
        log::warn!(
            "unrecognized boolean value \"{}\" for {}, using {}",
            value,
            name,
            default
        );
        default
    })
}

#[cfg(test)]
mod tests {
    use graft_testing::TestCases;

    use super::{env_flag, str_as_bool};

    #[test]
    fn test_str_as_bool() {
        #[derive(Debug)]
        struct Case {
            value: &'static str,
            expected: Option<bool>,
        }

        let cases = [
            Case {
                value: "1",
                expected: Some(true),
            },
            Case {
                value: "Yes",
                expected: Some(true),
            },
            Case {
                value: " true ",
                expected: Some(true),
            },
            Case {
                value: "0",
                expected: Some(false),
            },
            Case {
                value: "no",
                expected: Some(false),
            },
            Case {
                value: "",
                expected: Some(false),
            },
            Case {
                value: "maybe",
                expected: None,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(str_as_bool(case.value), case.expected);
        })
    }

    #[test]
    fn test_env_flag_unset_uses_default() {
        let name = "GRAFT_TEST_FLAG_THAT_IS_NEVER_SET";
        assert!(env_flag(name, true));
        assert!(!env_flag(name, false));
    }

    // Each test uses its own variable, since tests run concurrently.
    #[test]
    fn test_env_flag_set() {
        let name = "GRAFT_TEST_FLAG_SET";

        std::env::set_var(name, "on");
        assert!(env_flag(name, false));

        std::env::set_var(name, "0");
        assert!(!env_flag(name, true));

        std::env::set_var(name, "maybe");
        assert!(env_flag(name, true));
        assert!(!env_flag(name, false));

        std::env::remove_var(name);
    }
}
