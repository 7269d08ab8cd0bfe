//! Bounded queue of backup proxies.
//!
//! Backup proxies are fetched but not yet paid for, so they can be thrown away
//! freely. The queue has its own lock and never guards the active set.

use crate::proxy::Proxy;

use chrono::Local;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

/// FIFO of backup proxies shared by the refiller, the flush task and promotion.
pub struct BackupQueue {
    proxies: Mutex<VecDeque<Proxy>>,
    capacity: usize,
    /// Signaled when proxies are enqueued.
    available: Notify,
    /// Signaled when the queue is drained or cleared and needs a refill.
    wanted: Notify,
}

impl BackupQueue {
    /// Create an empty queue holding at most `capacity` proxies.
    pub fn new(capacity: usize) -> Self {
        Self {
            proxies: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            available: Notify::new(),
            wanted: Notify::new(),
        }
    }

    /// Remove and return the oldest backup proxy, waiting until one is available.
    pub async fn pop(&self) -> Proxy {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let popped = self.proxies.lock().pop_front();
            self.wanted.notify_one();
            if let Some(proxy) = popped {
                return proxy;
            }
            notified.await;
        }
    }

    /// Enqueue every proxy with at least `threshold` lifetime left, up to capacity.
    ///
    /// Returns the number of proxies accepted; the rest are discarded.
    pub fn push_fresh(&self, batch: Vec<Proxy>, threshold: Duration) -> usize {
        let now = Local::now();
        let mut accepted = 0;
        {
            let mut proxies = self.proxies.lock();
            for proxy in batch {
                if proxies.len() >= self.capacity {
                    break;
                }
                match proxy.remaining_at(now) {
                    Some(remaining) if remaining >= threshold => {
                        proxies.push_back(proxy);
                        accepted += 1;
                    }
                    _ => debug!("Discarding backup candidate {}: not fresh enough", proxy),
                }
            }
        }
        if accepted > 0 {
            self.available.notify_waiters();
        }
        accepted
    }

    /// Discard every backup proxy. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let cleared = std::mem::take(&mut *self.proxies.lock()).len();
        self.wanted.notify_one();
        cleared
    }

    /// Wait until a consumer or the flush task asks for a refill.
    pub(crate) async fn wait_for_demand(&self) {
        self.wanted.notified().await;
    }

    /// Number of queued backup proxies.
    pub fn len(&self) -> usize {
        self.proxies.lock().len()
    }

    /// Whether no backup proxy is queued.
    pub fn is_empty(&self) -> bool {
        self.proxies.lock().is_empty()
    }

    /// Whether the queue holds `capacity` proxies.
    pub fn is_full(&self) -> bool {
        self.proxies.lock().len() >= self.capacity
    }

    /// Maximum number of queued backup proxies.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tokio_test::{assert_pending, assert_ready, task};

    fn proxy(port: u16, minutes_left: i64) -> Proxy {
        Proxy::new("10.0.0.1", port, Local::now() + TimeDelta::minutes(minutes_left))
    }

    #[test]
    fn only_fresh_candidates_are_enqueued() {
        let queue = BackupQueue::new(3);
        let accepted = queue.push_fresh(
            vec![proxy(1, 20), proxy(2, 5)],
            Duration::from_secs(10 * 60),
        );
        assert_eq!(accepted, 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn unparseable_candidates_are_discarded() {
        let queue = BackupQueue::new(3);
        let broken = Proxy {
            ip: "10.0.0.1".to_string(),
            port: 1,
            expire_time: String::new(),
        };
        assert_eq!(queue.push_fresh(vec![broken], Duration::ZERO), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn stops_at_capacity() {
        let queue = BackupQueue::new(2);
        let accepted = queue.push_fresh(
            vec![proxy(1, 30), proxy(2, 30), proxy(3, 30)],
            Duration::from_secs(60),
        );
        assert_eq!(accepted, 2);
        assert!(queue.is_full());
        assert_eq!(queue.push_fresh(vec![proxy(4, 30)], Duration::from_secs(60)), 0);
    }

    #[test]
    fn pops_in_fifo_order() {
        let queue = BackupQueue::new(3);
        queue.push_fresh(vec![proxy(1, 30), proxy(2, 30)], Duration::ZERO);

        let first = assert_ready!(task::spawn(queue.pop()).poll());
        let second = assert_ready!(task::spawn(queue.pop()).poll());
        assert_eq!(first.port, 1);
        assert_eq!(second.port, 2);
    }

    #[test]
    fn pop_waits_until_a_proxy_arrives() {
        let queue = BackupQueue::new(3);
        let mut pop = task::spawn(queue.pop());
        assert_pending!(pop.poll());

        queue.push_fresh(vec![proxy(7, 30)], Duration::ZERO);
        assert!(pop.is_woken());
        let popped = assert_ready!(pop.poll());
        assert_eq!(popped.port, 7);
    }

    #[test]
    fn empty_pop_asks_for_a_refill() {
        let queue = BackupQueue::new(3);
        let mut pop = task::spawn(queue.pop());
        assert_pending!(pop.poll());

        let mut demand = task::spawn(queue.wait_for_demand());
        assert_ready!(demand.poll());
    }

    #[test]
    fn clear_empties_the_queue() {
        let queue = BackupQueue::new(3);
        queue.push_fresh(vec![proxy(1, 30), proxy(2, 30)], Duration::ZERO);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_ready!(task::spawn(queue.wait_for_demand()).poll());
    }
}
