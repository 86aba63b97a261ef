pub mod persistence;
pub mod telegram;
