pub mod errors;
pub mod order;
pub mod ports;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;
