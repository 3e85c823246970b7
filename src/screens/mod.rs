pub mod polling;
pub mod start;
pub mod status;
pub mod views;
