//! Bar feed port trait.

use crate::domain::error::SniperError;
use crate::domain::ohlcv::Bar;

/// An ordered, finite sequence of bars, consumed once.
///
/// Implementations hand out bars in the order they hold them; the engine
/// checks that timestamps strictly ascend.
pub trait FeedPort {
    /// `Ok(None)` once the feed is exhausted.
    fn next_bar(&mut self) -> Result<Option<Bar>, SniperError>;

    /// Human-readable source name for logs and reports.
    fn source_name(&self) -> String;
}
