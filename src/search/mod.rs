pub mod index;
pub mod result;
pub mod tokenize;

pub use index::{SearchField, SearchIndex};
pub use result::SearchResult;
