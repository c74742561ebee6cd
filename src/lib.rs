pub mod api;
pub mod cache;
pub mod config;
pub mod contact;
pub mod db;
pub mod fallback;
pub mod gate;
pub mod models;
pub mod request;
pub mod server;
pub mod token;
pub mod upstream;
pub use dotenv::dotenv;
