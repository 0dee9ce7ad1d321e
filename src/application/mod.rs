pub mod bootstrap;
pub mod commands;
pub mod day_transition;
pub mod documents;
pub mod events;
