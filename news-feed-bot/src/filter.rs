use crate::types::Item;

/// Keyword filter applied to every fetched item before it is stored.
///
/// A keyword matches when it occurs anywhere in the title, ignoring case,
/// or when it is exactly equal to one of the item's categories.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();

        Self { keywords, lowered }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn should_skip(&self, item: &Item) -> bool {
        if self.keywords.is_empty() {
            return false;
        }

        let title = item.title.to_lowercase();

        self.keywords.iter().zip(&self.lowered).any(|(keyword, lowered)| {
            title.contains(lowered.as_str())
                || item.categories.iter().any(|category| category == keyword)
        })
    }
}

/// Free-function form of [`KeywordFilter::should_skip`].
pub fn should_skip(item: &Item, keywords: &[String]) -> bool {
    KeywordFilter::new(keywords.iter().cloned()).should_skip(item)
}
