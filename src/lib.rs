pub mod blend;
pub mod compass;
pub mod config;
pub mod forecast;
pub mod load_error;
pub mod loader;
pub mod render;
pub mod scheduler;
pub mod selector;
pub mod services;
pub mod snapshot;
pub mod view;
