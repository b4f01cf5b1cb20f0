//! Environment/target resolution.
//!
//! Turns an environment name from process configuration into concrete
//! session construction parameters. Pure lookup, no I/O, no retry;
//! unrecognized or absent names fall back to `prod`.

/// Environment variable consulted by [`resolve_from_env`]
pub const ENV_VAR: &str = "TEST_ENV";

/// A credential pair for the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    /// Login username
    pub username: &'static str,
    /// Login password
    pub password: &'static str,
}

/// Known user profiles of the demo store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Normal user, login always succeeds
    Standard,
    /// Login is rejected with a locked-out error
    LockedOut,
    /// Logs in but the UI misbehaves
    Problem,
    /// Logs in slowly
    PerformanceGlitch,
}

impl Profile {
    /// Credentials for this profile
    #[must_use]
    pub const fn credentials(self) -> Credentials {
        let username = match self {
            Self::Standard => "standard_user",
            Self::LockedOut => "locked_out_user",
            Self::Problem => "problem_user",
            Self::PerformanceGlitch => "performance_glitch_user",
        };
        Credentials {
            username,
            password: "secret_sauce",
        }
    }
}

/// All profiles the store accepts at the login form
pub const KNOWN_PROFILES: [Profile; 4] = [
    Profile::Standard,
    Profile::LockedOut,
    Profile::Problem,
    Profile::PerformanceGlitch,
];

/// Resolved target: where sessions point and who they log in as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Environment name actually selected (after fallback)
    pub env: &'static str,
    /// Base URL for navigation
    pub base_url: &'static str,
    /// Default credential set
    pub credentials: Credentials,
}

/// Resolve an environment name into a [`Target`].
///
/// Recognized names are `dev`, `staging`, `local` and `prod`; anything
/// else (including `None`) resolves to `prod`.
#[must_use]
pub fn resolve(env_name: Option<&str>) -> Target {
    let (env, base_url) = match env_name {
        Some("dev") => ("dev", "https://dev.saucedemo.com"),
        Some("staging") => ("staging", "https://staging.saucedemo.com"),
        Some("local") => ("local", "http://localhost:3000"),
        _ => ("prod", "https://www.saucedemo.com"),
    };
    Target {
        env,
        base_url,
        credentials: Profile::Standard.credentials(),
    }
}

/// Resolve from the `TEST_ENV` process variable
#[must_use]
pub fn resolve_from_env() -> Target {
    resolve(std::env::var(ENV_VAR).ok().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_environments_resolve() {
        assert_eq!(resolve(Some("dev")).base_url, "https://dev.saucedemo.com");
        assert_eq!(
            resolve(Some("staging")).base_url,
            "https://staging.saucedemo.com"
        );
        assert_eq!(resolve(Some("local")).base_url, "http://localhost:3000");
        assert_eq!(resolve(Some("prod")).base_url, "https://www.saucedemo.com");
    }

    #[test]
    fn absent_env_falls_back_to_prod() {
        let target = resolve(None);
        assert_eq!(target.env, "prod");
        assert_eq!(target.base_url, "https://www.saucedemo.com");
    }

    #[test]
    fn unrecognized_env_falls_back_to_prod() {
        assert_eq!(resolve(Some("qa7")).env, "prod");
    }

    #[test]
    fn default_credentials_are_standard_user() {
        let target = resolve(None);
        assert_eq!(target.credentials.username, "standard_user");
        assert_eq!(target.credentials.password, "secret_sauce");
    }

    #[test]
    fn locked_out_profile_credentials() {
        let creds = Profile::LockedOut.credentials();
        assert_eq!(creds.username, "locked_out_user");
    }
}
