//! Outbound synchronization: form dispatch, bulk actions, default-list
//! enrolment and contact export.

pub mod bulk;
pub mod default_list;
pub mod dispatcher;
pub mod export;
pub mod operations;
