// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "dice/dice_service.rs"]
pub mod dice;

#[path = "giveaway/giveaway_service.rs"]
pub mod giveaway;

#[path = "pruning/pruner_service.rs"]
pub mod pruning;

#[path = "watcher/log_scanner.rs"]
pub mod watcher;
