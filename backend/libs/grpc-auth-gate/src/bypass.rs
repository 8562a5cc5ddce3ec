//! Methods that proceed without a credential
//!
//! Membership is exact: no prefix, suffix or case folding. Anything not listed
//! requires authentication.

use std::collections::HashSet;

/// Public methods of the user service (registration and login mint credentials)
pub const DEFAULT_BYPASS_METHODS: &[&str] = &[
    "/user.v1.UserService/Register",
    "/user.v1.UserService/Login",
];

/// Fixed set of method identifiers exempt from authentication
///
/// Built once at startup and read concurrently afterwards; there is no
/// mutation API. The default registry is empty, so every method requires a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BypassRegistry {
    methods: HashSet<String>,
}

impl BypassRegistry {
    pub fn new<I, M>(methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BYPASS_METHODS.iter().copied())
    }

    pub fn is_bypassed(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<M: Into<String>> FromIterator<M> for BypassRegistry {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_register_and_login() {
        let registry = BypassRegistry::with_defaults();

        assert!(registry.is_bypassed("/user.v1.UserService/Register"));
        assert!(registry.is_bypassed("/user.v1.UserService/Login"));
        assert!(!registry.is_bypassed("/user.v1.UserService/GetUser"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_no_partial_matches() {
        let registry = BypassRegistry::new(["/user.v1.UserService/Login"]);

        for near_miss in [
            "/user.v1.UserService/Login/",
            "/user.v1.UserService/LoginV2",
            "/user.v1.UserService/login",
            "user.v1.UserService/Login",
            "/user.v1.UserService/Log",
            " /user.v1.UserService/Login",
            "/user.v1.UserService/",
            "",
        ] {
            assert!(!registry.is_bypassed(near_miss), "{:?} must not bypass", near_miss);
        }
    }

    #[test]
    fn test_empty_registry_denies_everything() {
        let registry = BypassRegistry::default();

        assert!(registry.is_empty());
        assert!(!registry.is_bypassed("/user.v1.UserService/Login"));
    }

    #[test]
    fn test_collect_from_iterator() {
        let registry: BypassRegistry = vec!["/a.B/C".to_string()].into_iter().collect();

        assert!(registry.is_bypassed("/a.B/C"));
    }
}
