//! Test support for ccm-bridge
//!
//! Running a real ccm needs Java, downloaded Cassandra releases and minutes
//! per test. This crate stands in for the tool instead:
//! - [`FakeCcm`], an in-memory ccm that implements `CommandTransport`
//! - [`fixtures`], reply text shaped like the real tool's
//! - [`fast_config`] / [`bridge_for`], a bridge that polls without sleeping

use ccm_bridge::{Bridge, BridgeConfig, PollPolicy};
use std::time::Duration;

mod fake;
pub mod fixtures;

pub use fake::{FakeCcm, FakeNode};

/// Readiness attempts made by bridges from [`bridge_for`]
pub const FAST_POLL_ATTEMPTS: u32 = 3;

/// Default configuration, with a poll policy that gives up quickly.
pub fn fast_config() -> BridgeConfig {
    BridgeConfig {
        poll: PollPolicy::new(FAST_POLL_ATTEMPTS, Duration::ZERO),
        ..Default::default()
    }
}

/// A bridge driving `ccm`, which stays usable for inspection.
pub fn bridge_for(ccm: &FakeCcm) -> Bridge {
    match Bridge::with_transport(fast_config(), ccm.clone()) {
        Ok(bridge) => bridge,
        Err(e) => panic!("default configuration rejected: {e}"),
    }
}
