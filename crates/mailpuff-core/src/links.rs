//! Public URLs for pages.

use url::Url;

use crate::store::{PageId, Token};

/// Builds view and mark-read URLs from the configured viewer base URL.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    /// Parses the viewer base URL, e.g. `https://mail.example.com/view`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
        })
    }

    /// `<base>?id=…&token=…`, keeping any other query parameters of the base.
    #[must_use]
    pub fn view_url(&self, id: &PageId, token: &Token) -> String {
        with_access(self.base.clone(), id, token).into()
    }

    /// Same scheme, host and port as the base, path `/mark_read`.
    #[must_use]
    pub fn mark_url(&self, id: &PageId, token: &Token) -> String {
        let mut url = self.base.clone();
        url.set_path("/mark_read");
        with_access(url, id, token).into()
    }
}

fn with_access(mut url: Url, id: &PageId, token: &Token) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "id" && k != "token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("id", id.as_str())
        .append_pair("token", token.expose());
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_view_url() {
        let links = LinkBuilder::new("https://mail.example.com/view").unwrap();
        let url = links.view_url(&PageId::from("abc"), &Token::from("t_-1"));
        assert_eq!(url, "https://mail.example.com/view?id=abc&token=t_-1");
    }

    #[test]
    fn test_view_url_replaces_existing_access_params() {
        let links = LinkBuilder::new("https://h.example/view?lang=en&id=old&token=old").unwrap();
        let url = links.view_url(&PageId::from("new"), &Token::from("tok"));
        assert_eq!(url, "https://h.example/view?lang=en&id=new&token=tok");
    }

    #[test]
    fn test_mark_url_keeps_origin() {
        let links = LinkBuilder::new("http://127.0.0.1:8080/some/view").unwrap();
        let url = links.mark_url(&PageId::from("abc"), &Token::from("tok"));
        assert_eq!(url, "http://127.0.0.1:8080/mark_read?id=abc&token=tok");
    }

    #[test]
    fn test_relative_base_rejected() {
        assert!(LinkBuilder::new("/view").is_err());
    }
}
