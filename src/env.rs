//! Where the `REVLENS_*` and provider API key variables are read from.
//!
//! The config loader layers these over the TOML files. It takes an [`Env`]
//! rather than calling `std::env` itself so layering tests can pin the
//! variables they care about.

use std::collections::HashMap;

/// Source of environment variables: the process, or a fixed table.
#[derive(Clone, Debug, Default)]
pub struct Env {
    fixed: Option<HashMap<String, String>>,
}

impl Env {
    /// Read from the process environment.
    pub fn real() -> Self {
        Self { fixed: None }
    }

    /// Read only from `vars`; everything else is unset.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let fixed = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { fixed: Some(fixed) }
    }

    /// A variable's value, unless it is unset, not unicode or blank.
    ///
    /// An exported-but-empty `REVLENS_MODEL=` must not wipe the file config.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        let value = match &self.fixed {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// The first of `names` with a non-empty value.
    pub fn first(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.non_empty(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_env_sees_cargo_variables() {
        assert!(Env::real().non_empty("CARGO_MANIFEST_DIR").is_some());
    }

    #[test]
    fn mock_env_hides_the_process_environment() {
        let env = Env::mock([("REVLENS_MODEL", "m")]);
        assert_eq!(env.non_empty("REVLENS_MODEL").as_deref(), Some("m"));
        assert_eq!(env.non_empty("CARGO_MANIFEST_DIR"), None);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = Env::mock([("REVLENS_MODEL", "  ")]);
        assert_eq!(env.non_empty("REVLENS_MODEL"), None);
    }

    #[test]
    fn first_skips_unset_and_blank_names() {
        let env = Env::mock([("REVLENS_API_KEY", ""), ("ANTHROPIC_API_KEY", "sk-a")]);
        assert_eq!(
            env.first(&["REVLENS_API_KEY", "ANTHROPIC_API_KEY"]).as_deref(),
            Some("sk-a")
        );
        assert_eq!(env.first(&["OPENAI_API_KEY"]), None);
    }
}
