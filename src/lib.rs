pub mod auction;
pub mod clock;
pub mod service;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod tests;
