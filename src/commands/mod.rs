// ABOUTME: Command module aggregator for the hotpatch CLI.
// ABOUTME: Re-exports init, check, order and dispatch command handlers.

mod check;
mod dispatch;
mod init;
mod order;
mod runtime_connection;

pub use check::check;
pub use dispatch::dispatch;
pub use init::init;
pub use order::order;
