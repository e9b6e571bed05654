pub mod capture;
pub mod cli;
pub mod control;
pub mod cursor;
pub mod error;
pub mod framelog;
pub mod hexdump;
pub mod plugin;
pub mod plugins;
pub mod port;
pub mod session;
pub mod supervisor;
pub mod wire;

pub use error::AgentError;
pub use session::SessionState;
