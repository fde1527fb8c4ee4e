use std::sync::Arc;

use arc_swap::ArcSwap;
use ip_proxy_common::{Country, Reputation, SearchStrategy, SignatureIndex};

use crate::Result;

/// Resolves a remote address key to its geolocation and reputation categories.
pub trait Classifier: Send + Sync {
    fn country(&self, key: u32) -> Country;
    fn reputation(&self, key: u32) -> Reputation;
}

/// One generation of the geolocation and reputation signature tables.
#[derive(Debug, Clone, Default)]
pub struct Signatures {
    geolocation: SignatureIndex<Country>,
    reputation: SignatureIndex<Reputation>,
}

impl Signatures {
    pub fn new(
        geolocation: SignatureIndex<Country>,
        reputation: SignatureIndex<Reputation>,
    ) -> Self {
        Self {
            geolocation,
            reputation,
        }
    }

    pub fn geolocation_index(&self) -> &SignatureIndex<Country> {
        &self.geolocation
    }

    pub fn reputation_index(&self) -> &SignatureIndex<Reputation> {
        &self.reputation
    }
}

impl Classifier for Signatures {
    // the geolocation table is sparse, a bounded scan is cheap enough there
    #[inline]
    fn country(&self, key: u32) -> Country {
        self.geolocation.classify(key, SearchStrategy::Bounded)
    }

    #[inline]
    fn reputation(&self, key: u32) -> Reputation {
        self.reputation.classify(key, SearchStrategy::Ordered)
    }
}

/// Holds the current signature snapshot for concurrent readers.
///
/// Readers never block and see either the previous or the replacement
/// snapshot in full.
pub struct SignatureStore<C = Signatures> {
    current: ArcSwap<C>,
}

impl<C> SignatureStore<C> {
    pub fn new(signatures: C) -> Self {
        Self {
            current: ArcSwap::from_pointee(signatures),
        }
    }

    pub fn load(&self) -> Arc<C> {
        self.current.load_full()
    }

    pub fn replace(&self, signatures: C) {
        self.current.store(Arc::new(signatures));
    }

    /// Builds a new snapshot and swaps it in; the current one stays in place on error.
    pub fn reload_with<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<C>,
    {
        let signatures = build()?;
        self.replace(signatures);
        tracing::info!("signature tables reloaded");
        Ok(())
    }
}

impl<C: Default> Default for SignatureStore<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}
