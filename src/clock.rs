use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{Local, Utc};

/// Current time as both a GMT and a site-local unix timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamps {
    pub local: i64,
    pub gmt: i64,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamps;
}

/// Wall clock. The local timestamp is GMT shifted by the configured site
/// offset, or by the process' local offset when none is configured.
#[derive(Clone, Debug, Default)]
pub struct SystemClock {
    utc_offset_seconds: Option<i32>,
}

impl SystemClock {
    pub fn new(utc_offset_seconds: Option<i32>) -> Self {
        Self { utc_offset_seconds }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamps {
        let gmt = Utc::now().timestamp();
        let offset = self
            .utc_offset_seconds
            .unwrap_or_else(|| Local::now().offset().local_minus_utc());
        Timestamps {
            local: gmt + i64::from(offset),
            gmt,
        }
    }
}

/// A clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock {
    gmt: Arc<AtomicI64>,
    utc_offset_seconds: i32,
}

impl ManualClock {
    pub fn new(gmt: i64, utc_offset_seconds: i32) -> Self {
        Self {
            gmt: Arc::new(AtomicI64::new(gmt)),
            utc_offset_seconds,
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.gmt.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamps {
        let gmt = self.gmt.load(Ordering::SeqCst);
        Timestamps {
            local: gmt + i64::from(self.utc_offset_seconds),
            gmt,
        }
    }
}
