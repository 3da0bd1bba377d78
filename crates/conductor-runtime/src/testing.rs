//! Test doubles for the dispatch seam.
//!
//! [`ScriptedDispatcher`] lets tests decide per target whether a
//! dispatch succeeds, fails for the next N calls, fails forever, or
//! stalls, and records every call it receives.
//!
//! ```
//! use conductor_runtime::testing::ScriptedDispatcher;
//! use conductor_runtime::SystemDispatcher;
//! use conductor_event::ActionRequest;
//!
//! # tokio_test_block(async {
//! let dispatcher = ScriptedDispatcher::new();
//! dispatcher.fail_times("hvac", 1);
//!
//! let req = ActionRequest::new("hvac", "activate-heating");
//! assert!(dispatcher.dispatch(&req).await.is_err());
//! assert!(dispatcher.dispatch(&req).await.is_ok());
//! assert_eq!(dispatcher.calls_to("hvac"), 2);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread()
//! #         .enable_all()
//! #         .build()
//! #         .unwrap()
//! #         .block_on(f);
//! # }
//! ```

use crate::dispatch::{DispatchError, SystemDispatcher};
use async_trait::async_trait;
use conductor_event::ActionRequest;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    FailAlways,
    FailTimes(u32),
}

/// Dispatcher with per-target scripted behavior.
#[derive(Debug, Default)]
pub struct ScriptedDispatcher {
    scripts: Mutex<HashMap<String, Script>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<ActionRequest>>,
}

impl ScriptedDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dispatch to `target` is rejected.
    pub fn fail_always(&self, target: &str) {
        self.scripts
            .lock()
            .insert(target.to_string(), Script::FailAlways);
    }

    /// The next `n` dispatches to `target` are rejected.
    pub fn fail_times(&self, target: &str, n: u32) {
        self.scripts
            .lock()
            .insert(target.to_string(), Script::FailTimes(n));
    }

    /// Dispatches to `target` sleep before answering.
    pub fn delay(&self, target: &str, delay: Duration) {
        self.delays.lock().insert(target.to_string(), delay);
    }

    /// Clears scripts and delays for `target`.
    pub fn heal(&self, target: &str) {
        self.scripts.lock().remove(target);
        self.delays.lock().remove(target);
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<ActionRequest> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn calls_to(&self, target: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.target == target)
            .count()
    }

    fn should_fail(&self, target: &str) -> bool {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(target) {
            Some(Script::FailAlways) => true,
            Some(Script::FailTimes(n)) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SystemDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, request: &ActionRequest) -> Result<Value, DispatchError> {
        self.calls.lock().push(request.clone());
        let delay = self.delays.lock().get(&request.target).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail(&request.target) {
            return Err(DispatchError::rejected(&request.target, "scripted failure"));
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fail_always_until_healed() {
        let d = ScriptedDispatcher::new();
        d.fail_always("hvac");
        let req = ActionRequest::new("hvac", "x");
        assert!(d.dispatch(&req).await.is_err());
        assert!(d.dispatch(&req).await.is_err());
        d.heal("hvac");
        assert!(d.dispatch(&req).await.is_ok());
        assert_eq!(d.calls().len(), 3);
    }

    #[tokio::test]
    async fn other_targets_unaffected() {
        let d = ScriptedDispatcher::new();
        d.fail_always("hvac");
        assert!(d.dispatch(&ActionRequest::new("lighting", "x")).await.is_ok());
        assert_eq!(d.calls_to("hvac"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies() {
        let d = ScriptedDispatcher::new();
        d.delay("slow", Duration::from_secs(30));
        let start = tokio::time::Instant::now();
        d.dispatch(&ActionRequest::new("slow", "x")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
