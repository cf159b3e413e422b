pub mod manager;
pub mod worker;
