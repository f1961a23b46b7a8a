mod topic_service;

pub use topic_service::TopicService;
