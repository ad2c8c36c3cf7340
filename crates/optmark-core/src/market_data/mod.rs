pub mod loader;
pub mod quote;
pub mod series;
pub mod writer;
