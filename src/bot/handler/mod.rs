pub mod handler;
#[cfg(test)]
pub mod mock;
