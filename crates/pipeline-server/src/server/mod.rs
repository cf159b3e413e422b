pub mod accum;
pub mod config;
pub mod controller;
pub mod generator;
pub mod pool;
pub mod publisher;
pub mod stage;
pub mod telemetry;
