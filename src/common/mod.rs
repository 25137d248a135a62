pub mod broadcast;
pub mod capture;
pub mod config;
pub mod events;
pub mod location;
pub mod record;
pub mod session;
