// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "automod/config_store.rs"]
pub mod automod;
