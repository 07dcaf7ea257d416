pub mod batch_operations;
pub mod client;
