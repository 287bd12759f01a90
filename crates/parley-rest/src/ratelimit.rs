//! Rate-limit bookkeeping
//!
//! Pure data and predicates; the dispatcher worker is the only mutator.
//! All predicates take an explicit `now` so they can be tested without
//! sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// State of one server-declared rate-limit bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBucket {
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: Instant,
}

impl RateLimitBucket {
    /// A request on this bucket must wait until `reset_at`
    #[must_use]
    pub fn is_exhausted(&self, now: Instant) -> bool {
        self.remaining == 0 && self.reset_at > now
    }

    /// Remaining delay before the window resets, if exhausted
    #[must_use]
    pub fn delay_until_reset(&self, now: Instant) -> Option<Duration> {
        if self.is_exhausted(now) {
            Some(self.reset_at - now)
        } else {
            None
        }
    }
}

/// Rate-limit state parsed from one response's headers
#[derive(Debug, Clone)]
pub struct RateLimitUpdate {
    /// Server-assigned bucket id, when the response carried one
    pub bucket_id: Option<String>,
    pub limit: u32,
    pub remaining: u32,
    /// Window reset, relative to receipt of the response
    pub reset_after: Duration,
}

/// Keyed store of bucket state
///
/// Buckets are keyed by the server-assigned bucket id when one has been
/// observed, falling back to the route template otherwise. Once a
/// bucket id is seen for a route, every later request on that route is
/// attributed to the same id. Two routes sharing a template but mapping
/// to different true buckets merge under the fallback key; that is a
/// known approximation, kept intentionally.
#[derive(Debug, Default)]
pub struct RateLimitTable {
    buckets: HashMap<String, RateLimitBucket>,
    route_buckets: HashMap<String, String>,
}

impl RateLimitTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the bucket governing a route template
    #[must_use]
    pub fn bucket_for(&self, route: &str) -> Option<&RateLimitBucket> {
        let key = self.route_buckets.get(route).map_or(route, String::as_str);
        self.buckets.get(key)
    }

    /// Record the rate-limit state from a response on `route`
    pub fn record(&mut self, route: &str, update: RateLimitUpdate, now: Instant) {
        let bucket = RateLimitBucket {
            limit: update.limit,
            remaining: update.remaining,
            reset_at: now + update.reset_after,
        };

        match update.bucket_id {
            Some(id) => {
                self.route_buckets.insert(route.to_string(), id.clone());
                self.buckets.insert(id, bucket);
            }
            None => {
                self.buckets.insert(route.to_string(), bucket);
            }
        }
    }

    /// Number of tracked buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Process-wide throttle flag, set when a response declares the global
/// limit was hit
#[derive(Debug, Default)]
pub struct GlobalThrottle {
    limited: bool,
    retry_at: Option<Instant>,
}

impl GlobalThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the global limit hit; requests wait until `now + retry_after`
    pub fn set(&mut self, retry_after: Duration, now: Instant) {
        self.limited = true;
        self.retry_at = Some(now + retry_after);
    }

    /// Clear the throttle (any non-global response does this)
    pub fn clear(&mut self) {
        self.limited = false;
        self.retry_at = None;
    }

    /// Whether requests must currently wait
    #[must_use]
    pub fn is_limited(&self, now: Instant) -> bool {
        self.limited && self.retry_at.is_some_and(|at| at > now)
    }

    /// Remaining delay before requests may proceed
    #[must_use]
    pub fn remaining_delay(&self, now: Instant) -> Option<Duration> {
        if !self.limited {
            return None;
        }
        self.retry_at.and_then(|at| at.checked_duration_since(now))
    }
}
