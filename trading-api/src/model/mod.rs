pub mod account;
pub mod funding;
pub mod order;
pub mod symbol;
