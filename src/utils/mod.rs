pub mod buffer;
pub mod channel;
