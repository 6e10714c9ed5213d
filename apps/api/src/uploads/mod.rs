// Upload side channel: text extraction from uploaded files and durable
// storage of the original file plus its metadata record.

pub mod extract;
pub mod handlers;
pub mod store;
