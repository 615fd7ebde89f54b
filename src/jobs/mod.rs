//! Background jobs.

mod revalidate;

pub use revalidate::{LogNotifier, RevalidateJob};
