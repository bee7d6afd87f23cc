//! Process-wide indexed state: the connected-client set, the UID pool, and
//! the joined-player counter. Enumeration hands out a snapshot so callers
//! iterate without holding the map lock.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::client::Client;

#[derive(Debug, Default)]
pub struct Registry {
    clients: Mutex<HashMap<u64, Arc<Client>>>,
    next_conn_id: AtomicU64,
    uids: Mutex<UidPool>,
    players: AtomicI64,
}

#[derive(Debug, Default)]
struct UidPool {
    freed: BinaryHeap<Reverse<i32>>,
    next: i32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, client: Arc<Client>) {
        self.clients.lock().insert(client.id(), client);
    }

    pub fn remove(&self, id: u64) -> Option<Arc<Client>> {
        self.clients.lock().remove(&id)
    }

    pub fn snapshot(&self) -> Vec<Arc<Client>> {
        self.clients.lock().values().cloned().collect()
    }

    pub fn player_count(&self) -> i64 {
        self.players.load(Ordering::Relaxed)
    }

    pub fn add_player(&self) {
        self.players.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remove_player(&self) {
        self.players.fetch_sub(1, Ordering::Relaxed);
    }

    /// Hands out the smallest free UID.
    pub fn take_uid(&self) -> i32 {
        let mut pool = self.uids.lock();
        if let Some(Reverse(uid)) = pool.freed.pop() {
            return uid;
        }
        let uid = pool.next;
        pool.next += 1;
        uid
    }

    pub fn release_uid(&self, uid: i32) {
        if uid >= 0 {
            self.uids.lock().freed.push(Reverse(uid));
        }
    }
}
