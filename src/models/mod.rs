pub mod giveaway;

pub use giveaway::*;
