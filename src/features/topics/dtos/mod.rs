mod topic_dto;

pub use topic_dto::*;
