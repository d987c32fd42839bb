pub mod entry;

pub use entry::{Attempt, AuthEntry, AuthLog, DatedEntries, Location};
