// Discord commands module.
// Each feature gets its own command file.

pub mod giveaway;

pub mod help;

pub mod invite;

pub mod poll;

pub mod roll;
