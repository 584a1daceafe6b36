//! In-memory bar feed.

use std::collections::VecDeque;

use crate::domain::error::SniperError;
use crate::domain::ohlcv::Bar;
use crate::ports::feed_port::FeedPort;

/// Replays a fixed list of bars in the given order, unchecked.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    name: String,
    bars: VecDeque<Bar>,
}

impl MemoryFeed {
    pub fn new(name: &str, bars: Vec<Bar>) -> Self {
        MemoryFeed {
            name: name.to_string(),
            bars: bars.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bars.len()
    }
}

impl FeedPort for MemoryFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, SniperError> {
        Ok(self.bars.pop_front())
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn drains_in_order() {
        let ts = |d| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let bar = |d, close| Bar {
            timestamp: ts(d),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        };
        let mut feed = MemoryFeed::new("mem", vec![bar(1, 1.0), bar(2, 2.0)]);
        assert_eq!(feed.remaining(), 2);
        assert_eq!(feed.next_bar().unwrap().unwrap().close, 1.0);
        assert_eq!(feed.next_bar().unwrap().unwrap().close, 2.0);
        assert!(feed.next_bar().unwrap().is_none());
        assert_eq!(feed.source_name(), "mem");
    }
}
