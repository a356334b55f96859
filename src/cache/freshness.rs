//! Freshness Evaluator
//!
//! Decides, for one request and one stored entry, whether the entry may be
//! served as is, served stale while a refresh runs, or must be bypassed.
//!
//! `max-age` and `min-fresh` are client demands on freshness; `max-stale` is a
//! client tolerance for staleness. An expired entry with no `max-stale` bound is
//! served lazily: the stale response goes out now and one refresh is scheduled.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::cache::{CacheEntry, RequestDirectives};

// == Freshness Decision ==
/// Outcome of evaluating a request against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// Caching does not apply to this request at all
    Bypass,
    /// The entry satisfies every directive
    ServeCached,
    /// The entry is expired but tolerable; serve it and refresh in the background
    ServeCachedAfterRefreshTrigger,
    /// The client must not receive the cached entry
    Reject,
}

// == Evaluate ==
/// Evaluates `entry` against the request `directives` at instant `now`.
///
/// Never returns [`FreshnessDecision::Bypass`]; that outcome belongs to callers
/// that decide caching does not apply before an entry is looked up.
pub fn evaluate(
    directives: &RequestDirectives,
    entry: Option<&CacheEntry>,
    now: DateTime<Utc>,
) -> FreshnessDecision {
    if directives.no_cache || directives.max_age.is_some_and(|age| age.as_secs() == 0) {
        return FreshnessDecision::Reject;
    }

    let Some(entry) = entry else {
        return FreshnessDecision::Reject;
    };

    if let Some(max_age) = directives.max_age {
        // An unrepresentable deadline lies beyond any real clock reading.
        if let Some(oldest) = shift(entry.created, max_age, true) {
            if oldest < now {
                return FreshnessDecision::Reject;
            }
        }
    }

    let effective_expiration = match directives.max_stale {
        Some(max_stale) => shift(entry.expiration, max_stale, true),
        None => Some(entry.expiration),
    };

    if effective_expiration.is_some_and(|expiration| expiration < now) {
        return if directives.max_stale.is_some() {
            FreshnessDecision::Reject
        } else {
            FreshnessDecision::ServeCachedAfterRefreshTrigger
        };
    }

    if let Some(min_fresh) = directives.min_fresh {
        match shift(entry.expiration, min_fresh, false) {
            Some(fresh_until) if fresh_until >= now => {}
            _ => return FreshnessDecision::Reject,
        }
    }

    FreshnessDecision::ServeCached
}

/// Moves `instant` forward or backward by `by`, `None` on overflow.
fn shift(instant: DateTime<Utc>, by: Duration, forward: bool) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(by).ok()?;
    if forward {
        instant.checked_add_signed(delta)
    } else {
        instant.checked_sub_signed(delta)
    }
}
