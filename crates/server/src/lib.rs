pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod instances;
pub mod routes;
pub mod state;
