mod meta_dto;

pub use meta_dto::*;
