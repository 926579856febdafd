use crate::feed::Article;

/// Case-insensitive phrase blocklist applied to query results.
///
/// Matches against the title and summary only. Never touches storage, so a
/// changed phrase list applies to the next read.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    phrases: Vec<String>,
}

impl Blocklist {
    /// Blank phrases are dropped.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|phrase| phrase.as_ref().trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn matches(&self, article: &Article) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let text = format!("{} {}", article.title, article.summary).to_lowercase();
        self.phrases.iter().any(|phrase| text.contains(phrase.as_str()))
    }

    /// Splits `articles` into the ones to show and the number hidden.
    pub fn apply(&self, articles: Vec<Article>) -> (Vec<Article>, usize) {
        let total = articles.len();
        let kept: Vec<Article> = articles
            .into_iter()
            .filter(|article| !self.matches(article))
            .collect();
        let filtered = total - kept.len();
        (kept, filtered)
    }
}

/// One-shot form of [`Blocklist::apply`].
pub fn filter_articles<S: AsRef<str>>(articles: Vec<Article>, phrases: &[S]) -> (Vec<Article>, usize) {
    Blocklist::new(phrases).apply(articles)
}
