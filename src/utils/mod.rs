pub mod secrets;

// Trait-based abstraction for testability
pub mod executor;

pub use executor::{CapturedOutput, DockerExecutor, ExecCommand, ExecError, ExecResult, ProcessExecutor};
pub use secrets::SecretResolver;
