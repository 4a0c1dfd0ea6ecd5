mod seq;
mod slot_buf;

pub use seq::*;
pub use slot_buf::*;
