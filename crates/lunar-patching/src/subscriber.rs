//! Patch group subscriber tokens

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque token holding a patch group active
///
/// Tokens compare by identity: two tokens created with the same source are
/// still distinct subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscriber {
    id: u64,
    source: Option<String>,
}

impl Subscriber {
    /// The shared token used when callers do not care about identity
    pub fn generic() -> Self {
        Self { id: 0, source: None }
    }

    /// A fresh token labelled with where it came from
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            source: Some(source.into()),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_generic(&self) -> bool {
        self.id == 0
    }
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::generic()
    }
}

impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}#{}", source, self.id),
            None => f.write_str("generic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_tokens_are_equal() {
        assert_eq!(Subscriber::generic(), Subscriber::generic());
        assert!(Subscriber::default().is_generic());
    }

    #[test]
    fn test_new_tokens_are_unique() {
        let a = Subscriber::new("Foo");
        let b = Subscriber::new("Foo");
        assert_ne!(a, b);
        assert_eq!(a.source(), Some("Foo"));
        assert!(!a.is_generic());
    }
}
