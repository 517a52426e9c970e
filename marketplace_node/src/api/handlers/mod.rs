pub mod agent;
pub mod documents;
pub mod purchases;
pub mod stats;
pub mod users;
