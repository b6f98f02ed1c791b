use crate::database::store::GiveawayStore;
use crate::error::AppResult;
use crate::models::Giveaway;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// In-memory store with the same semantics as the Mongo implementation.
/// Used by unit tests and local runs without a database; records are kept
/// in insertion order so `find_due` is deterministic.
#[derive(Clone, Default)]
pub struct InMemoryGiveawayStore {
    records: Arc<Mutex<Vec<Giveaway>>>,
}

impl InMemoryGiveawayStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(&self, id: &str, f: impl FnOnce(&mut Giveaway) -> T) -> Option<T> {
        let mut records = self.records.lock().unwrap();
        records.iter_mut().find(|g| g.id == id).map(f)
    }
}

#[async_trait]
impl GiveawayStore for InMemoryGiveawayStore {
    async fn insert(&self, giveaway: &Giveaway) -> AppResult<()> {
        self.records.lock().unwrap().push(giveaway.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Giveaway>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|g| g.id == id).cloned())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Giveaway>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().filter(|g| g.is_due(now)).cloned().collect())
    }

    async fn claim_ended(&self, id: &str) -> AppResult<bool> {
        Ok(self
            .with_record(id, |g| {
                if g.ended {
                    false
                } else {
                    g.ended = true;
                    true
                }
            })
            .unwrap_or(false))
    }

    async fn push_entries(&self, id: &str, user_id: &str, count: u32) -> AppResult<()> {
        self.with_record(id, |g| {
            for _ in 0..count {
                g.entrants.push(user_id.to_string());
            }
        });
        Ok(())
    }

    async fn pull_entries(&self, id: &str, user_id: &str) -> AppResult<()> {
        self.with_record(id, |g| g.entrants.retain(|e| e != user_id));
        Ok(())
    }

    async fn set_end_time(&self, id: &str, end_time: DateTime<Utc>) -> AppResult<()> {
        self.with_record(id, |g| g.end_time = end_time);
        Ok(())
    }

    async fn set_final_hash(&self, id: &str, hash: &str) -> AppResult<()> {
        self.with_record(id, |g| g.final_hash = Some(hash.to_string()));
        Ok(())
    }

    async fn set_result_message(&self, id: &str, message_id: &str) -> AppResult<()> {
        self.with_record(id, |g| g.result_message_id = Some(message_id.to_string()));
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|g| g.id != id);
        Ok(records.len() < before)
    }
}
