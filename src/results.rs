mod record;
mod result_set;

pub use record::{FromRecord, Record};
pub use result_set::ResultSet;
