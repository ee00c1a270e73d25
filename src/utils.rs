// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains small internal helpers.
use std::time::{Duration, Instant};

/// Period between two emissions of the same rate-limited log line.
pub(crate) const LOG_THROTTLE_PERIOD: Duration = Duration::from_secs(30);

/// Rate limiter for log lines that would otherwise fire every tick.
///
/// One instance per call site. `ready` returns true at most once per
/// [`LOG_THROTTLE_PERIOD`].
#[derive(Debug, Default)]
pub(crate) struct Throttle {
    last: Option<Instant>,
}

impl Throttle {
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < LOG_THROTTLE_PERIOD => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
