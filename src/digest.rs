//! Grouping and ordering of admitted articles.
//!
//! [`DigestBuilder`] collects articles into their categories in arrival
//! order; [`DigestBuilder::finalize`] sorts each category newest-first and
//! freezes the result into a [`Digest`] for the renderer.

use serde::Serialize;

use crate::source::Article;

/// One category's final, ordered articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub articles: Vec<Article>,
}

/// The finished output of a run: categories in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Digest {
    categories: Vec<Category>,
}

impl Digest {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[cfg(test)]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn article_count(&self) -> usize {
        self.categories.iter().map(|c| c.articles.len()).sum()
    }
}

/// Accumulates articles per category before sorting.
#[derive(Debug, Default)]
pub struct DigestBuilder {
    categories: Vec<Category>,
}

impl DigestBuilder {
    /// Start a digest whose categories appear in the given order, even if
    /// some of them end up empty.  Repeated names keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::default();
        for name in names {
            builder.slot(name.into());
        }
        builder
    }

    /// Append an article to its category, creating the category at the end
    /// if it was not declared up front.
    pub fn push(&mut self, article: Article) {
        let idx = self.slot(article.category.clone());
        self.categories[idx].articles.push(article);
    }

    /// Sort every category newest-first and return the final digest.
    ///
    /// The sort is stable, so articles with equal timestamps, and all
    /// undated articles, keep their arrival order.
    pub fn finalize(mut self) -> Digest {
        for category in &mut self.categories {
            category.articles.sort_by(Article::newest_first);
        }
        Digest {
            categories: self.categories,
        }
    }

    fn slot(&mut self, name: String) -> usize {
        if let Some(idx) = self.categories.iter().position(|c| c.name == name) {
            return idx;
        }
        self.categories.push(Category {
            name,
            articles: Vec::new(),
        });
        self.categories.len() - 1
    }
}
