pub mod health;
pub mod transcoding;
pub mod webhooks;
