pub mod dispatch;
pub mod envelope;
pub mod help;
pub mod registry;
pub mod tools;
