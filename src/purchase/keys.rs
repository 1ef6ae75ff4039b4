//! Store key derivation.

use super::client::ClientId;

/// Derives the store keys for a client.
///
/// Claim keys and counter keys differ in their second segment and the client
/// identifier is always the full suffix, so keys never collide across the two
/// families or across clients:
///
/// ```text
/// {namespace}:rate:{client}
/// {namespace}:count:{client}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Key whose existence marks an active purchase window.
    pub fn rate_key(&self, client: &ClientId) -> String {
        format!("{}:rate:{}", self.namespace, client)
    }

    /// Key holding the lifetime purchase count.
    pub fn count_key(&self, client: &ClientId) -> String {
        format!("{}:count:{}", self.namespace, client)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("corn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let keys = KeySpace::default();
        let client = ClientId::parse("client-123").unwrap();

        assert_eq!(keys.rate_key(&client), "corn:rate:client-123");
        assert_eq!(keys.count_key(&client), "corn:count:client-123");
    }

    #[test]
    fn test_families_do_not_collide() {
        let keys = KeySpace::new("stand");
        // A client id that looks like the other family's suffix
        let tricky = ClientId::parse("count:x").unwrap();
        let plain = ClientId::parse("x").unwrap();

        assert_ne!(keys.rate_key(&tricky), keys.count_key(&plain));
        assert_ne!(keys.rate_key(&plain), keys.count_key(&plain));
        assert_ne!(keys.count_key(&tricky), keys.count_key(&plain));
    }
}
