pub mod chat;
pub mod api;
