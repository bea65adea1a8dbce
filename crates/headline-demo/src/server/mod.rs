pub mod app;
pub mod pages;
pub mod routes;

pub use app::*;
pub use routes::*;
