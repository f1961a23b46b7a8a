mod report;

pub use report::{Report, ReportKind, ReportStatus};
