// src/crawl/frontier.rs
// =============================================================================
// The frontier is the work queue shared by all workers of one crawl.
//
// It holds:
// - a queue of links waiting to be checked
// - the set of every URL ever offered (the "visited" set)
// - the number of links currently being checked by a worker
// - the broken links found so far
//
// Termination: the crawl graph is discovered while we walk it, so "the queue
// is empty" is not enough to stop. A worker may be halfway through a page
// and about to offer twenty new links. The frontier is only *drained* when
// the queue is empty AND no worker holds a link, and both numbers are read
// under the same lock.
//
// Rust concepts:
// - Mutex: the state is only touched while holding the lock, and the lock is
//   never held across an .await
// - Notify: lets sleeping workers (and the orchestrator) wait for a change
//   without polling
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::model::Link;

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Link>,
    visited: HashSet<String>,
    in_flight: usize,
    dispatched: usize,
    closed: bool,
}

impl State {
    fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<State>,
    broken: Mutex<Vec<Link>>,
    work_ready: Notify,
    drained: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `link` unless its URL has been offered before.
    ///
    /// Checking and inserting into the visited set happen in one step under
    /// the lock, so two workers offering the same URL at the same moment
    /// still produce a single queue entry. Returns whether the link was
    /// queued.
    pub fn offer(&self, link: Link) -> bool {
        {
            let mut state = self.lock();
            if state.closed || !state.visited.insert(link.url.clone()) {
                return false;
            }
            state.queue.push_back(link);
        }
        self.work_ready.notify_one();
        true
    }

    /// Waits for the next link to check.
    ///
    /// Returns `None` once the frontier is closed. Every `Some` must be
    /// followed by exactly one call to [`Frontier::mark_done`].
    pub async fn take(&self) -> Option<Link> {
        loop {
            // Register interest before looking at the queue, so an offer()
            // landing between the check and the await still wakes us up
            let notified = self.work_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(link) = state.queue.pop_front() {
                    state.in_flight += 1;
                    state.dispatched += 1;
                    return Some(link);
                }
            }

            notified.await;
        }
    }

    /// Releases the link handed out by the matching [`Frontier::take`].
    pub fn mark_done(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_drained()
        };
        if drained {
            self.drained.notify_waiters();
        }
    }

    /// Blocks until the queue is empty and no link is in flight.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().is_drained() {
                return;
            }

            notified.await;
        }
    }

    /// Stops the frontier: pending and future `take()` calls return `None`
    /// and further offers are refused.
    pub fn close(&self) {
        self.lock().closed = true;
        self.work_ready.notify_waiters();
    }

    pub fn record_broken(&self, link: Link) {
        self.broken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(link);
    }

    /// Number of distinct URLs ever offered.
    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of links handed to workers so far.
    pub fn dispatched(&self) -> usize {
        self.lock().dispatched
    }

    /// Takes the broken links recorded so far, in the order they were found.
    pub fn take_broken(&self) -> Vec<Link> {
        std::mem::take(
            &mut *self
                .broken
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    // A panicking worker can't leave the state half-updated (every critical
    // section is a few field writes), so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
