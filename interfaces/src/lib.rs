pub mod defs;

pub use defs::{Article, Item, NewArticle, Source};
