//! Discord adapter: serenity gateway handler and REST permission writes.

pub mod client;
pub mod convert;
pub mod error;
pub mod handler;
pub mod rest;

pub use {
    client::{build_client, intents},
    error::{Error, Result},
    handler::CurfewHandler,
    rest::SerenityPermissionApi,
};
