pub mod balances;
pub mod health;
pub mod hook;
pub mod jwt;
pub mod portfolio;
pub mod quote;
