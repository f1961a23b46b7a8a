mod meta_handler;

pub use meta_handler::*;
