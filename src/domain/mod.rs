pub mod boundary;
pub mod generator;
pub mod history;
pub mod models;
pub mod mutation;
pub mod priority;
pub mod time;
