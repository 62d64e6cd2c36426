//! Password lookup for database targets
//!
//! Targets name an environment variable rather than carrying a password.
//! The resolver takes one snapshot at startup so providers never read
//! ambient process state while building commands.

use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Default)]
pub struct SecretResolver {
    values: HashMap<String, String>,
}

impl SecretResolver {
    /// Resolver over an explicit set of variables
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Snapshot of the process environment, layered over `.env` entries.
    ///
    /// Variables already set in the process take precedence.
    pub fn from_env(dotenv: HashMap<String, String>) -> Self {
        let mut values = dotenv;
        values.extend(std::env::vars());
        Self { values }
    }

    /// Look up the plaintext value of an environment variable name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve an optional reference, as configured on a target
    pub fn resolve_ref(&self, name: Option<&str>) -> Option<&str> {
        name.and_then(|n| self.resolve(n))
    }
}

impl fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResolver")
            .field("entries", &self.values.len())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
