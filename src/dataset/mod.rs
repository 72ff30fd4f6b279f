pub mod loader;
pub mod record;
pub mod snapshot;

pub use self::record::{Dataset, Field, Metric, Record};
