//! Outgoing request throttling shared by the HTTP providers.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;

/// Requests per minute when the caller does not configure a limit.
pub const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(60u32);

/// A direct (un-keyed) limiter allowing `per_minute` requests with a burst of the same size.
pub fn limiter(per_minute: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_minute(per_minute))
}
