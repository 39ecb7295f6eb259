//! Articles are the root record type: everything else hangs off a news
//! article somebody entered. Their ids are content-derived so the same story
//! submitted twice lands on the same identity.

use ::error::{DError, DResult};
use ::fingerprint;

model! {
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Article {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub author: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub headline: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub body: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub published_at: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub source_name: Option<String>,
    }
}
make_storable!(Article, "articles");

impl Article {
    /// Derive this article's stable id from its natural key fields. Two
    /// submissions that agree on normalized url/author/headline always get
    /// the same id, which is what kills most duplicate inserts before the
    /// fuzzy matcher ever runs.
    pub fn content_id(&self) -> DResult<String> {
        let url = match self.url.as_ref() {
            Some(x) => x,
            None => return Err(DError::MissingField(format!("Article.url"))),
        };
        let author = self.author.as_ref().map(|x| x.as_str()).unwrap_or("");
        let headline = match self.headline.as_ref() {
            Some(x) => x,
            None => return Err(DError::MissingField(format!("Article.headline"))),
        };
        Ok(fingerprint::generate_article_id(url, author, headline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::models::model::Model;

    #[test]
    fn content_ids_are_stable() {
        let mut article = Article::new();
        article.url = Some(String::from("http://example.com/story"));
        article.author = Some(String::from("Jane Reporter"));
        article.headline = Some(String::from("Man killed downtown"));
        let id1 = article.content_id().unwrap();
        let id2 = article.content_id().unwrap();
        assert_eq!(id1, id2);
        assert!(id1.starts_with("art_"));

        article.headline = Some(String::from("Man killed uptown"));
        assert!(article.content_id().unwrap() != id1);
    }

    #[test]
    fn content_id_requires_natural_keys() {
        let mut article = Article::new();
        article.headline = Some(String::from("no url on this one"));
        assert!(article.content_id().is_err());
        assert!(article.is_new());
    }
}
