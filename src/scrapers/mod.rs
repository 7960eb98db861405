//! Incremental feed crawling.
//!
//! News listings render a fixed number of cards and grow through a
//! "load more" control. [`ensure_loaded`] drives that control until a target
//! card count is reached or the feed stops producing, and is generic over
//! [`FeedPage`] so the WebDriver-backed page and test doubles share one loop.
//!
//! # Termination policy
//!
//! Every wait is a bounded poll: an explicit deadline plus a sleep interval,
//! never an open-ended block. Exhaustion is not an error — when the trigger
//! disappears or the count stops growing, the loop accepts the partial result
//! and returns. A single stalled growth wait is treated as end-of-content and
//! is never retried; a feed with truly exhausted pages would otherwise keep
//! the crawler polling forever.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::errors::EtlError;

pub mod infomoney;

/// Ceiling for each bounded wait inside the feed loop.
pub const FEED_WAIT: Duration = Duration::from_secs(20);
/// Interval between polls of the rendered page.
pub const FEED_POLL: Duration = Duration::from_millis(500);

/// Observable surface of an incrementally loaded listing page.
pub trait FeedPage {
    /// Number of item containers currently rendered.
    async fn item_count(&mut self) -> Result<usize, EtlError>;

    /// Locate and activate the load-more control.
    ///
    /// Returns `Ok(false)` when the control never became actionable within
    /// `wait` — the caller treats that as end-of-content, not as an error.
    async fn trigger_load_more(&mut self, wait: Duration) -> Result<bool, EtlError>;
}

/// Poll `page` until its item count exceeds `floor` or the deadline passes.
///
/// Returns the last observed count and whether the floor was exceeded.
async fn wait_for_growth<P: FeedPage>(
    page: &mut P,
    floor: usize,
    wait: Duration,
    poll: Duration,
) -> Result<(usize, bool), EtlError> {
    let deadline = Instant::now() + wait;
    loop {
        let count = page.item_count().await?;
        if count > floor {
            return Ok((count, true));
        }
        if Instant::now() >= deadline {
            return Ok((count, false));
        }
        sleep(poll).await;
    }
}

/// Keep triggering "load more" until at least `minimum` items are rendered.
///
/// Returns the number of items present when the loop stopped, which may be
/// anything from zero (the feed never rendered) up to whatever the trigger
/// produced past `minimum`. Partial results are accepted on every stopping
/// condition; only a page-driving failure propagates.
pub async fn ensure_loaded<P: FeedPage>(
    page: &mut P,
    minimum: usize,
    wait: Duration,
    poll: Duration,
) -> Result<usize, EtlError> {
    let (mut count, appeared) = wait_for_growth(page, 0, wait, poll).await?;
    if !appeared {
        info!(count, "no feed items appeared before the deadline");
        return Ok(count);
    }

    while count < minimum {
        let previous = count;

        if !page.trigger_load_more(wait).await? {
            debug!(count, "load-more control unavailable; accepting partial feed");
            break;
        }

        let (next, grew) = wait_for_growth(page, previous, wait, poll).await?;
        if !grew {
            debug!(count, "feed stopped growing; accepting partial feed");
            break;
        }
        count = next;
    }

    info!(count, minimum, "feed pagination settled");
    Ok(count)
}
