pub mod climate;
pub mod error;
pub mod price;
pub mod production;
