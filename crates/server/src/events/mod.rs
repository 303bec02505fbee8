pub mod aggregate;
pub mod model;
pub mod parser;
pub mod route;
