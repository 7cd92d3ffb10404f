pub mod client;
pub mod sleeper;

#[cfg(test)]
pub mod mock;
