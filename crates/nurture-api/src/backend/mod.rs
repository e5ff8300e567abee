mod auth;
pub mod client;
pub mod models;
pub mod rest;

pub use client::BackendClient;
pub use models::{
    AdminStatsRecord, AppUserRecord, AuthSession, AuthUser, EmotionLogRecord, JsonRunRecord,
    PlannerRunRecord, SubscriptionStatusRecord, UserProfileRecord,
};
pub use rest::{Order, Select};
