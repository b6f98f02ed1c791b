use crate::error::AppResult;
use crate::models::Giveaway;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{DateTime as BsonDateTime, doc};

/// Document-store primitives the lifecycle core needs. The production
/// implementation is [`MongoGiveawayStore`]; tests use the in-memory
/// implementation in [`crate::database::memory`].
///
/// Entry mutations are additive/subtractive array operations rather than
/// read-modify-write of the whole document, and [`claim_ended`] is the
/// atomic commit point of finalization: it succeeds for exactly one caller
/// per record.
///
/// [`claim_ended`]: GiveawayStore::claim_ended
#[async_trait]
pub trait GiveawayStore: Send + Sync {
    async fn insert(&self, giveaway: &Giveaway) -> AppResult<()>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Giveaway>>;

    /// All records with `end_time <= now` that are not yet ended, in store
    /// query order.
    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Giveaway>>;

    /// Atomically set `ended = true` if it was not already set. Returns
    /// whether this call won the claim.
    async fn claim_ended(&self, id: &str) -> AppResult<bool>;

    /// Append `count` occurrences of `user_id` to the entry pool.
    async fn push_entries(&self, id: &str, user_id: &str, count: u32) -> AppResult<()>;

    /// Remove every occurrence of `user_id` from the entry pool.
    async fn pull_entries(&self, id: &str, user_id: &str) -> AppResult<()>;

    async fn set_end_time(&self, id: &str, end_time: DateTime<Utc>) -> AppResult<()>;

    async fn set_final_hash(&self, id: &str, hash: &str) -> AppResult<()>;

    async fn set_result_message(&self, id: &str, message_id: &str) -> AppResult<()>;

    /// Returns whether a record was actually removed.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct MongoGiveawayStore {
    collection: Collection<Giveaway>,
}

impl MongoGiveawayStore {
    pub fn new(collection: Collection<Giveaway>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl GiveawayStore for MongoGiveawayStore {
    async fn insert(&self, giveaway: &Giveaway) -> AppResult<()> {
        self.collection.insert_one(giveaway).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Giveaway>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Giveaway>> {
        let cursor = self
            .collection
            .find(doc! {
                "end_time": { "$lte": BsonDateTime::from_chrono(now) },
                "ended": { "$ne": true },
            })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn claim_ended(&self, id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id, "ended": { "$ne": true } },
                doc! { "$set": { "ended": true } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn push_entries(&self, id: &str, user_id: &str, count: u32) -> AppResult<()> {
        let entries = vec![user_id.to_string(); count as usize];
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "entrants": { "$each": entries } } },
            )
            .await?;
        Ok(())
    }

    async fn pull_entries(&self, id: &str, user_id: &str) -> AppResult<()> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$pull": { "entrants": user_id } })
            .await?;
        Ok(())
    }

    async fn set_end_time(&self, id: &str, end_time: DateTime<Utc>) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "end_time": BsonDateTime::from_chrono(end_time) } },
            )
            .await?;
        Ok(())
    }

    async fn set_final_hash(&self, id: &str, hash: &str) -> AppResult<()> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "final_hash": hash } })
            .await?;
        Ok(())
    }

    async fn set_result_message(&self, id: &str, message_id: &str) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "result_message_id": message_id } },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
