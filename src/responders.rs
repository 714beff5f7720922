//! Concrete participant responders

mod llm;
mod proxy;

pub use llm::LlmResponder;
pub use proxy::ProxyResponder;
