// Server module entry
// Listener setup, connection serving, accept loops and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used items
pub use connection::Service;
pub use listener::{create_listener, BACKLOG};
pub use server_loop::{drain_connections, start_server_loop};
pub use signal::{start_signal_handler, ShutdownSignal};
