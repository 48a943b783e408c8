//! The item collection the explorer browses, the background worker that
//! answers searches and distance requests against it, and the links a user
//! derives from a selection.

mod annotate;
mod dataset;
mod error;
mod fetch;
mod parse;

pub use annotate::{ANNOTATION_KINDS, merge_links, selection_links};
pub use dataset::{Dataset, Item};
pub use error::FetchError;
pub use fetch::{FetchPayload, FetchRequest, Fetcher, LayoutPayload};
pub use parse::{load_dataset, parse_dataset};
