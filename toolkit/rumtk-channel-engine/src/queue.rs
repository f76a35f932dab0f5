/*
 * rumtk attempts to implement HL7 and medical protocols for interoperability in medicine.
 * This toolkit aims to be reliable, simple, performant, and standards compliant.
 * Copyright (C) 2025  Luis M. Santos, M.D.
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; if not, write to the Free Software
 * Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA
 */

use crate::message::ConnectorMessage;
use ahash::AHashSet;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One logical bucket of the queue: a `VecDeque`-backed buffer plus the set of ids
/// currently on loan to a worker via [ConnectorMessageQueue::acquire], grounded on
/// `rumtk-core::queue`'s `TaskQueue` (`VecDeque` behind a mutex, workers pulling
/// batches) generalized to carry `ConnectorMessage`s instead of generic `Task`s and to
/// support returning an item to the front of the queue on a failed send.
struct Bucket {
    items: VecDeque<ConnectorMessage>,
    acquired: AHashSet<u64>,
    /// Set by `release(finished=false)`: every worker skips past the current head once,
    /// so a message that just failed doesn't get immediately re-acquired by the same
    /// worker ahead of its siblings.
    rotate_once: bool,
    deleted: AHashSet<u64>,
}

impl Bucket {
    fn new() -> Bucket {
        Bucket {
            items: VecDeque::new(),
            acquired: AHashSet::default(),
            rotate_once: false,
            deleted: AHashSet::default(),
        }
    }
}

/// Bucketing/capacity/grouping policy for one [ConnectorMessageQueue] (spec §4.3).
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    pub thread_count: usize,
    pub group_by: Option<String>,
    pub buffer_capacity: usize,
}

impl Default for QueuePolicy {
    fn default() -> QueuePolicy {
        QueuePolicy {
            thread_count: 1,
            group_by: None,
            buffer_capacity: 1000,
        }
    }
}

///
/// One destination's outstanding work, bucketed by `groupBy`/`threadCount` per spec
/// §4.3. `add`/`acquire` are safe to call concurrently from multiple callers because
/// every bucket is independently mutex-guarded; `invalidate` takes every bucket's lock
/// at once, which is the queue's documented mutual exclusion with all other ops.
///
pub struct ConnectorMessageQueue {
    policy: QueuePolicy,
    buckets: Vec<Mutex<Bucket>>,
    /// First-seen group value -> bucket index, assigned monotonically as new group
    /// values show up; later values hash into the bucket space instead.
    group_assignments: Mutex<HashMap<String, usize>>,
}

impl ConnectorMessageQueue {
    pub fn new(policy: QueuePolicy) -> ConnectorMessageQueue {
        let bucket_count = policy.thread_count.max(1);
        let buckets = (0..bucket_count).map(|_| Mutex::new(Bucket::new())).collect();
        ConnectorMessageQueue {
            policy,
            buckets,
            group_assignments: Mutex::new(HashMap::new()),
        }
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_for(&self, cm: &ConnectorMessage) -> usize {
        let group_by = match &self.policy.group_by {
            Some(g) if self.bucket_count() > 1 => g,
            _ => return 0,
        };
        let key = cm
            .connector_map
            .get(group_by.as_str())
            .map(|v| v.to_string())
            .unwrap_or_default();
        let mut assignments = self.group_assignments.lock().unwrap();
        let next = assignments.len();
        if let Some(&idx) = assignments.get(&key) {
            return idx;
        }
        let idx = if next < self.bucket_count() {
            next
        } else {
            (hash_str(&key) as usize) % self.bucket_count()
        };
        assignments.insert(key, idx);
        idx
    }

    /// Appends `cm` to whichever bucket its `groupBy` value (or lack thereof) resolves
    /// to. Respects `bufferCapacity`: callers whose in-memory buffer is full are
    /// expected to have already persisted the overflow and rely on `fillBuffer` to pull
    /// it back in, mirroring the datastore-backed sizing spec §4.3 describes.
    pub fn add(&self, cm: ConnectorMessage) {
        let idx = self.bucket_for(&cm);
        let mut bucket = self.buckets[idx].lock().unwrap();
        bucket.items.push_back(cm);
    }

    /// Pulls the next available item out of `bucket_idx`, skipping one item if a
    /// rotation was requested by a previous failed `release`, and skipping anything
    /// already on loan or marked deleted.
    pub fn acquire(&self, bucket_idx: usize) -> Option<ConnectorMessage> {
        let mut bucket = self.buckets.get(bucket_idx)?.lock().unwrap();
        if bucket.rotate_once {
            if let Some(front) = bucket.items.pop_front() {
                bucket.items.push_back(front);
            }
            bucket.rotate_once = false;
        }
        let len = bucket.items.len();
        for _ in 0..len {
            let item = bucket.items.pop_front()?;
            if bucket.deleted.remove(&item.message_id) {
                continue;
            }
            bucket.acquired.insert(item.message_id);
            return Some(item);
        }
        None
    }

    /// Returns `cm` to circulation. `finished = true` drops it (the caller already
    /// persisted a terminal status); `finished = false` puts it back at the tail of its
    /// bucket and requests a one-time rotation so the next `acquire` doesn't
    /// immediately hand it straight back out.
    pub fn release(&self, cm: ConnectorMessage, finished: bool) {
        let idx = self.bucket_for(&cm);
        let mut bucket = self.buckets[idx].lock().unwrap();
        bucket.acquired.remove(&cm.message_id);
        if !finished {
            bucket.items.push_back(cm);
            bucket.rotate_once = true;
        }
    }

    /// Flags `message_id` for removal on its next `acquire`/`release`, without
    /// scanning every bucket now — the id may not have reached this queue's buffer yet.
    pub fn mark_as_deleted(&self, message_id: u64) {
        for bucket in &self.buckets {
            bucket.lock().unwrap().deleted.insert(message_id);
        }
    }

    /// Drops `cm` instead of returning it to circulation if it was marked deleted while
    /// on loan; returns whether it was dropped.
    pub fn release_if_deleted(&self, cm: ConnectorMessage) -> bool {
        let idx = self.bucket_for(&cm);
        let mut bucket = self.buckets[idx].lock().unwrap();
        bucket.acquired.remove(&cm.message_id);
        if bucket.deleted.remove(&cm.message_id) {
            true
        } else {
            bucket.items.push_back(cm);
            false
        }
    }

    /// Reported queue size across every bucket. Reflects the in-memory buffer only;
    /// the datastore-backed total (spec §4.3: "reported size reflects datastore size")
    /// is the caller's responsibility to combine with persisted overflow.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().unwrap().items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket_capacity(&self) -> usize {
        self.policy.buffer_capacity
    }

    pub fn thread_count(&self) -> usize {
        self.bucket_count()
    }

    /// Clears every bucket and resets group assignments, the queue's once-at-a-time
    /// operation per spec §4.3 ("mutually exclusive with all other ops") — modeled here
    /// by taking every bucket's lock before mutating any of them.
    pub fn invalidate(&self, reset_group_assignments: bool) {
        let mut locks: Vec<_> = self.buckets.iter().map(|b| b.lock().unwrap()).collect();
        for bucket in locks.iter_mut() {
            bucket.items.clear();
            bucket.acquired.clear();
            bucket.deleted.clear();
            bucket.rotate_once = false;
        }
        if reset_group_assignments {
            self.group_assignments.lock().unwrap().clear();
        }
    }

    /// Pulls persisted overflow back into the in-memory buffer up to `bufferCapacity`.
    /// The datastore itself is injected by the caller (typically the owning
    /// destination's `Datastore` handle) since the queue has no persistence dependency
    /// of its own.
    pub fn fill_buffer(&self, mut fetch: impl FnMut(usize) -> Vec<ConnectorMessage>) {
        let capacity = self.policy.buffer_capacity;
        for bucket_lock in &self.buckets {
            let room = {
                let bucket = bucket_lock.lock().unwrap();
                capacity.saturating_sub(bucket.items.len())
            };
            if room == 0 {
                continue;
            }
            let fetched = fetch(room);
            let mut bucket = bucket_lock.lock().unwrap();
            for item in fetched {
                bucket.items.push_back(item);
            }
        }
    }
}

fn hash_str(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumtk_core::strings::RUMString;

    fn cm(id: u64) -> ConnectorMessage {
        ConnectorMessage::new(1, id, RUMString::from("chan"), RUMString::from("Dest1"), RUMString::from("srv-1"))
    }

    #[test]
    fn add_and_acquire_round_trips_a_single_bucket() {
        let queue = ConnectorMessageQueue::new(QueuePolicy::default());
        queue.add(cm(1));
        let acquired = queue.acquire(0).unwrap();
        assert_eq!(acquired.message_id, 1);
        assert!(queue.acquire(0).is_none());
    }

    #[test]
    fn release_not_finished_requeues_and_rotates() {
        let queue = ConnectorMessageQueue::new(QueuePolicy::default());
        queue.add(cm(1));
        queue.add(cm(2));
        let first = queue.acquire(0).unwrap();
        assert_eq!(first.message_id, 1);
        queue.release(first, false);
        // Rotation means the just-released item 1 is skipped once in favor of item 2.
        let next = queue.acquire(0).unwrap();
        assert_eq!(next.message_id, 2);
    }

    #[test]
    fn mark_as_deleted_drops_item_on_next_acquire() {
        let queue = ConnectorMessageQueue::new(QueuePolicy::default());
        queue.add(cm(1));
        queue.mark_as_deleted(1);
        assert!(queue.acquire(0).is_none());
    }

    #[test]
    fn release_if_deleted_drops_instead_of_requeueing() {
        let queue = ConnectorMessageQueue::new(QueuePolicy::default());
        queue.add(cm(1));
        let acquired = queue.acquire(0).unwrap();
        queue.mark_as_deleted(1);
        let dropped = queue.release_if_deleted(acquired);
        assert!(dropped);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn invalidate_clears_every_bucket() {
        let policy = QueuePolicy { thread_count: 2, ..QueuePolicy::default() };
        let queue = ConnectorMessageQueue::new(policy);
        queue.add(cm(1));
        queue.add(cm(2));
        queue.invalidate(true);
        assert_eq!(queue.len(), 0);
    }
}
