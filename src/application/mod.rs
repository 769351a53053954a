//! Application services: session handling and the page use cases.

pub mod chrome;
pub mod composer;
pub mod error;
pub mod feed;
pub mod repos;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
