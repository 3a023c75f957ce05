//! Bearer-token claim access.
//!
//! The host verifies tokens; this module only decodes the payload so CLAIM
//! fields can be read. Decoding is parse-without-verify and is gated by the
//! `extract-unverified-claims` flag. Parsed claim sets are cached per token
//! string with TTL and size-bounded LRU eviction.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use indexmap::IndexMap;
use tracing::debug;

use crate::config::TokenCacheConfig;

/// Decode the payload segment of a JWT without verifying the signature.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url-encoded JSON object payload.
pub fn parse_unverified(token: &str) -> Option<serde_json::Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.is_object().then_some(claims)
}

/// TTL + LRU cache of parsed claim sets, keyed by the raw token string.
///
/// Entries expire after the configured TTL and are evicted lazily on access;
/// when the cache is full the least recently used entry is dropped.
pub struct TokenCache {
    config: TokenCacheConfig,
    inner: Mutex<IndexMap<String, CachedClaims>>,
}

struct CachedClaims {
    claims: Arc<serde_json::Value>,
    inserted: Instant,
}

impl TokenCache {
    pub fn new(config: TokenCacheConfig) -> Self {
        TokenCache {
            inner: Mutex::new(IndexMap::new()),
            config,
        }
    }

    /// Parse `token`, consulting the cache first when enabled.
    pub fn claims_for(&self, token: &str) -> Option<Arc<serde_json::Value>> {
        if !self.config.enabled || self.config.max_size == 0 {
            return parse_unverified(token).map(Arc::new);
        }

        let ttl = Duration::from_secs(self.config.ttl_seconds);
        {
            let mut cache = self.lock();
            if let Some(idx) = cache.get_index_of(token) {
                if cache[idx].inserted.elapsed() < ttl {
                    let claims = cache[idx].claims.clone();
                    // Move to the back so LRU eviction spares it.
                    let last = cache.len() - 1;
                    cache.move_index(idx, last);
                    return Some(claims);
                }
                cache.shift_remove_index(idx);
            }
        }

        let claims = Arc::new(parse_unverified(token)?);
        let mut cache = self.lock();
        if cache.len() >= self.config.max_size {
            let expired: Vec<String> = cache
                .iter()
                .filter(|(_, v)| v.inserted.elapsed() >= ttl)
                .map(|(k, _)| k.clone())
                .collect();
            for key in expired {
                cache.shift_remove(&key);
            }
            while cache.len() >= self.config.max_size {
                cache.shift_remove_index(0);
            }
        }
        debug!(cached = cache.len() + 1, "parsed token cached");
        cache.insert(
            token.to_string(),
            CachedClaims {
                claims: claims.clone(),
                inserted: Instant::now(),
            },
        );
        Some(claims)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, CachedClaims>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn parses_payload_claims() {
        let token = make_token(serde_json::json!({"sub": "u1", "tenant": "acme"}));
        let claims = parse_unverified(&token).unwrap();
        assert_eq!(claims["sub"], "u1");
        assert_eq!(claims["tenant"], "acme");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse_unverified("not-a-jwt").is_none());
        assert!(parse_unverified("a.b").is_none());
        assert!(parse_unverified("a.%%%.c").is_none());
        assert!(parse_unverified("a.b.c.d").is_none());
    }

    #[test]
    fn cache_returns_same_parse(){
        let cache = TokenCache::new(TokenCacheConfig::default());
        let token = make_token(serde_json::json!({"sub": "u1"}));
        let first = cache.claims_for(&token).unwrap();
        let second = cache.claims_for(&token).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let cache = TokenCache::new(TokenCacheConfig {
            enabled: true,
            ttl_seconds: 3600,
            max_size: 2,
        });
        let a = make_token(serde_json::json!({"sub": "a"}));
        let b = make_token(serde_json::json!({"sub": "b"}));
        let c = make_token(serde_json::json!({"sub": "c"}));
        cache.claims_for(&a);
        cache.claims_for(&b);
        cache.claims_for(&a); // refresh a; b becomes the LRU entry
        cache.claims_for(&c);
        assert_eq!(cache.len(), 2);
        let snapshot: Vec<String> = cache.lock().keys().cloned().collect();
        assert!(snapshot.contains(&a));
        assert!(snapshot.contains(&c));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = TokenCache::new(TokenCacheConfig {
            enabled: false,
            ..TokenCacheConfig::default()
        });
        let token = make_token(serde_json::json!({"sub": "u1"}));
        assert!(cache.claims_for(&token).is_some());
        assert!(cache.is_empty());
    }
}
