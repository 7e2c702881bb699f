pub mod http;
mod socket;
pub mod temp;
pub mod wait;

// re-export
pub use socket::next_addr;
