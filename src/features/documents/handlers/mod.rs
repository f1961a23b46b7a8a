mod document_handler;

pub use document_handler::*;
