pub mod indexes;
pub mod models;
pub mod time;
