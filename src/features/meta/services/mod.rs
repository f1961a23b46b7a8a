mod meta_service;

pub use meta_service::{increment_counter, MetaService};
