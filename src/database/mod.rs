pub mod connection;
pub mod memory;
pub mod store;

pub use connection::{connect, ensure_indexes};
pub use memory::InMemoryGiveawayStore;
pub use store::{GiveawayStore, MongoGiveawayStore};
