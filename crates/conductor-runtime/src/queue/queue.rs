//! Queue storage and ordering.
//!
//! # Ordering
//!
//! Items are kept sorted by priority, highest first. A new item goes in
//! front of the first item with strictly lower priority, so items of
//! equal priority leave in arrival order. A retried item goes in front
//! of the first item whose priority is not higher than its own, i.e.
//! at the head of its own priority band.
//!
//! # Full Queue
//!
//! | Situation | Result |
//! |-----------|--------|
//! | room left | item queued |
//! | full, lowest item below the displacement ceiling and below the new item | lowest item dead-lettered `queue-full-displaced`, new item queued |
//! | full otherwise | new item dead-lettered `queue-full-rejected` |
//!
//! The victim must rank strictly below the incoming item, so an incoming
//! priority 3 never displaces a queued 3.
//!
//! The length never exceeds `max_depth`. The dead-letter store keeps at
//! least one entry, so no item leaves the queue without a trace.

use crate::config::QueueConfig;
use conductor_event::ActionRequest;
use conductor_types::{Priority, QueueItemId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// One pending action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub request: ActionRequest,
    pub priority: Priority,
    pub enqueued_at_ms: u64,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Rule that produced this action, if any.
    pub origin_rule: Option<String>,
    pub last_error: Option<String>,
}

impl QueueItem {
    #[must_use]
    pub fn new(request: ActionRequest, priority: Priority, max_attempts: u32, now_ms: u64) -> Self {
        Self {
            id: QueueItemId::new(),
            request,
            priority,
            enqueued_at_ms: now_ms,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            origin_rule: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_origin_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.origin_rule = Some(rule_id.into());
        self
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.request.target
    }

    /// `true` once no further attempt is allowed.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Why an item ended up in the dead-letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeadLetterReason {
    QueueFullDisplaced,
    QueueFullRejected,
    MaxAttemptsExceeded,
    UnknownSystem,
}

impl DeadLetterReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueFullDisplaced => "queue-full-displaced",
            Self::QueueFullRejected => "queue-full-rejected",
            Self::MaxAttemptsExceeded => "max-attempts-exceeded",
            Self::UnknownSystem => "unknown-system",
        }
    }
}

impl std::fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dead-letter entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub item: QueueItem,
    pub reason: DeadLetterReason,
    /// Last dispatch error, when the item failed rather than overflowed.
    pub failure_reason: Option<String>,
    pub dead_lettered_at_ms: u64,
}

/// Result of putting an item into the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Queued,
    /// Queued after moving `victim` to the dead-letter queue.
    Displaced { victim: QueueItem },
    /// Not queued; the item itself was dead-lettered.
    Rejected { item: QueueItem },
}

#[derive(Debug)]
pub struct OrchestrationQueue {
    items: VecDeque<QueueItem>,
    dead_letters: VecDeque<DeadLetter>,
    max_depth: usize,
    dead_letter_capacity: usize,
    displacement_ceiling: u8,
}

impl OrchestrationQueue {
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            items: VecDeque::new(),
            dead_letters: VecDeque::new(),
            max_depth: config.max_depth.max(1),
            dead_letter_capacity: config.dead_letter_capacity.max(1),
            displacement_ceiling: config.displacement_ceiling,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Adds a new item in priority order.
    pub fn enqueue(&mut self, item: QueueItem, now_ms: u64) -> EnqueueOutcome {
        let at = self
            .items
            .iter()
            .position(|queued| queued.priority < item.priority)
            .unwrap_or(self.items.len());
        self.insert_with_room(item, at, now_ms)
    }

    /// Puts a failed item back at the head of its priority band.
    pub fn requeue_front(&mut self, item: QueueItem, now_ms: u64) -> EnqueueOutcome {
        let at = self
            .items
            .iter()
            .position(|queued| queued.priority <= item.priority)
            .unwrap_or(self.items.len());
        self.insert_with_room(item, at, now_ms)
    }

    fn insert_with_room(&mut self, item: QueueItem, at: usize, now_ms: u64) -> EnqueueOutcome {
        if self.items.len() < self.max_depth {
            debug!(id = %item.id, target = %item.target(), priority = item.priority.get(), "queued");
            self.items.insert(at, item);
            return EnqueueOutcome::Queued;
        }

        match self.displacement_victim(item.priority) {
            Some(victim_idx) => {
                let Some(victim) = self.items.remove(victim_idx) else {
                    return self.reject(item, now_ms);
                };
                // Victim sits after every slot the new item could take.
                let at = at.min(self.items.len());
                warn!(
                    displaced = %victim.id,
                    target = %victim.target(),
                    priority = victim.priority.get(),
                    "queue full, displacing lowest-priority item"
                );
                self.push_dead_letter(victim.clone(), DeadLetterReason::QueueFullDisplaced, None, now_ms);
                self.items.insert(at, item);
                EnqueueOutcome::Displaced { victim }
            }
            None => self.reject(item, now_ms),
        }
    }

    fn reject(&mut self, item: QueueItem, now_ms: u64) -> EnqueueOutcome {
        warn!(id = %item.id, target = %item.target(), "queue full, rejecting item");
        self.push_dead_letter(item.clone(), DeadLetterReason::QueueFullRejected, None, now_ms);
        EnqueueOutcome::Rejected { item }
    }

    /// Index of the newest item in the lowest priority band, if that
    /// band is below the ceiling and below `incoming`.
    fn displacement_victim(&self, incoming: Priority) -> Option<usize> {
        let (idx, victim) = self
            .items
            .iter()
            .enumerate()
            .rev()
            .min_by_key(|(_, queued)| queued.priority)?;
        (victim.priority.get() < self.displacement_ceiling && victim.priority < incoming)
            .then_some(idx)
    }

    /// Removes and returns the first item `dispatchable` accepts.
    /// Items passed over keep their place and are not charged an attempt.
    pub fn next_dispatchable(
        &mut self,
        dispatchable: impl Fn(&QueueItem) -> bool,
    ) -> Option<QueueItem> {
        let idx = self.items.iter().position(dispatchable)?;
        self.items.remove(idx)
    }

    /// Moves an item to the dead-letter queue.
    pub fn dead_letter(
        &mut self,
        item: QueueItem,
        reason: DeadLetterReason,
        failure_reason: Option<String>,
        now_ms: u64,
    ) {
        warn!(id = %item.id, target = %item.target(), %reason, "dead-lettered");
        self.push_dead_letter(item, reason, failure_reason, now_ms);
    }

    fn push_dead_letter(
        &mut self,
        item: QueueItem,
        reason: DeadLetterReason,
        failure_reason: Option<String>,
        now_ms: u64,
    ) {
        while self.dead_letters.len() >= self.dead_letter_capacity {
            self.dead_letters.pop_front();
        }
        self.dead_letters.push_back(DeadLetter {
            item,
            reason,
            failure_reason,
            dead_lettered_at_ms: now_ms,
        });
    }

    /// Pending items in dequeue order.
    #[must_use]
    pub fn items(&self) -> Vec<QueueItem> {
        self.items.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// Dead letters, oldest first.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.iter().cloned().collect()
    }
}
