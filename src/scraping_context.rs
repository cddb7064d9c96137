use std::time::Duration;

use crate::{
    config::{FetchEnv, SiteConfig},
    discovery::{PageCursor, PageSource},
    page_parser::PageParser,
    requests::{FetchRequest, RequestClient},
    retry::RetryPolicy,
};

/// Everything one run needs, built once in `main` and passed down.
pub struct ScrapingContext {
    pub site: SiteConfig,
    pub parser: PageParser,
    pub request_client: RequestClient,
}

impl ScrapingContext {
    pub fn new(
        site: SiteConfig,
        env: &FetchEnv,
        retry: RetryPolicy,
        polite_delay: Duration,
    ) -> anyhow::Result<Self> {
        let parser = PageParser::new(&site)?;
        let request_client = RequestClient::new(env, retry, polite_delay)?;
        Ok(ScrapingContext {
            site,
            parser,
            request_client,
        })
    }

    /// Page one is a plain GET; later pages are form POSTs carrying the page
    /// index.
    pub fn listing_request(&self, cursor: &PageCursor) -> anyhow::Result<FetchRequest> {
        let request = match cursor {
            PageCursor::Index(1) => FetchRequest::Get {
                url: self.site.listing_url()?,
            },
            PageCursor::Index(page) => {
                let pagination = &self.site.pagination;
                let mut form = vec![(pagination.page_param.clone(), page.to_string())];
                form.extend(
                    pagination
                        .extra_form
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
                FetchRequest::PostForm {
                    url: self.site.listing_url()?,
                    form,
                }
            }
            PageCursor::Link(url) => FetchRequest::Get { url: url.clone() },
        };
        Ok(request)
    }
}

impl PageSource for ScrapingContext {
    async fn listing_page(&self, cursor: &PageCursor) -> anyhow::Result<String> {
        let request = self.listing_request(cursor)?;
        let body = self.request_client.fetch(&request).await?;
        Ok(body)
    }

    async fn detail_page(&self, url: &str) -> anyhow::Result<String> {
        let request = FetchRequest::Get {
            url: url.to_string(),
        };
        let body = self.request_client.fetch(&request).await?;
        Ok(body)
    }
}
