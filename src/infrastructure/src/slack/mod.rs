pub mod blocks;
pub mod client;

pub use client::SlackClient;
