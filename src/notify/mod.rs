pub mod discord;
pub mod embed;
