pub mod client;
pub mod config;
pub mod console;
pub mod html;
pub mod logging;
pub mod markup;
pub mod report;
pub mod response;

#[cfg(test)]
mod test_support;
