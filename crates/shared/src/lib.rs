pub mod catalog;
pub mod coach;
pub mod messages;
pub mod persian;

pub use catalog::{Catalog, Product, ProductCard};
pub use coach::{ChatMessage, ChatOutcome, ChatResult, CoachReply, CoachSession, FollowUp, Phase, Sender};
pub use messages::*;
