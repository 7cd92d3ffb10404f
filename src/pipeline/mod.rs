pub mod cycle;
pub mod filter;
pub mod state;
