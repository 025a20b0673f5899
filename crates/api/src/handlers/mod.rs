pub mod chips;
pub mod session;
