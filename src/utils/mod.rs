pub mod winner;

pub use winner::*;
