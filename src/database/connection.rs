use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::models::Giveaway;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;

pub const GIVEAWAYS_COLLECTION: &str = "giveaways";

pub async fn connect(config: &DatabaseConfig) -> AppResult<Collection<Giveaway>> {
    let client = Client::with_uri_str(&config.uri).await?;
    Ok(client
        .database(&config.database)
        .collection::<Giveaway>(GIVEAWAYS_COLLECTION))
}

/// TTL index on `end_time` so closed records are reclaimed by the store
/// once the retention window elapses.
pub async fn ensure_indexes(
    collection: &Collection<Giveaway>,
    retention_days: u64,
) -> AppResult<()> {
    let model = IndexModel::builder()
        .keys(doc! { "end_time": 1 })
        .options(
            IndexOptions::builder()
                .expire_after(Duration::from_secs(retention_days * 24 * 3600))
                .build(),
        )
        .build();
    collection.create_index(model).await?;
    Ok(())
}
