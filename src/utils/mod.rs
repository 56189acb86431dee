// Utils module - terminal output, local/remote execution and the ssh transport
pub mod exec;
pub mod output;
pub mod ssh;

// Re-export commonly used utilities
pub use exec::{CommandOutput, RemoteTransport, shell_escape};
pub use output::{Console, Style};
pub use ssh::SshConnection;
