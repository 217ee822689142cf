pub mod client;
pub mod messages;
pub mod transport;

pub use client::HttpTransport;
pub use messages::AgentReplyMessage;
pub use transport::{AgentReply, RemoteTransport};
