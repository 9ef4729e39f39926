//! Route handlers.

pub mod cache;
pub mod events;
pub mod health;
pub mod intercept;
pub mod proxy;
pub mod youtube;
