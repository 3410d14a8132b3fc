pub mod http;
pub mod memory;

pub use http::{receipt_url, ClientError, HttpOrderApi};
pub use memory::InMemoryOrderApi;
