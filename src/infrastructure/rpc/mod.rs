pub mod codec;
pub mod server;

pub use codec::handle_line;
pub use server::{MAX_LINE_BYTES, RpcServer};
