pub mod chart;
pub mod config;
pub mod plot;
pub mod render;
pub mod series;
pub mod table;
pub mod util;
