// The infra module contains implementations of core ports.
// Each feature implementation goes in its own submodule.

#[path = "giveaway/serenity_tally.rs"]
pub mod giveaway;

#[path = "pruning/serenity_deleter.rs"]
pub mod pruning;

#[path = "watcher/mod.rs"]
pub mod watcher;
