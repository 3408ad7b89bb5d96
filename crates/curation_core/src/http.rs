use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::CollectionKey,
    error::{ApiError, ApiException},
    protocol::{
        CandidateEntity, ChangeEntry, CommitSelectionRequest, GalleryQuery, Page, PageRequest,
        SessionInfo,
    },
};
use tracing::debug;
use url::Url;

use crate::{CurationApi, SessionProvider};

/// JSON-over-HTTP implementation of the remote collaborators.
#[derive(Clone)]
pub struct HttpCurationApi {
    http: Client,
    base: Url,
    bearer_token: Option<String>,
}

impl HttpCurationApi {
    pub fn new(api_url: &str, bearer_token: Option<String>) -> Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("invalid api url '{api_url}'"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api url '{api_url}' cannot be used as a base"));
        }
        Ok(Self {
            http: Client::new(),
            base,
            bearer_token: bearer_token.filter(|token| !token.is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_page(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Page<CandidateEntity>> {
        debug!(%url, "fetching page");
        let res = self
            .authorized(self.http.get(url.clone()))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        decode(res).await
    }
}

fn page_query(page: PageRequest) -> Vec<(&'static str, String)> {
    vec![
        ("offset", page.offset.to_string()),
        ("limit", page.limit.to_string()),
    ]
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    if status.is_success() {
        return res.json().await.context("failed to decode response body");
    }
    Err(error_from_response(res).await)
}

async fn error_from_response(res: Response) -> anyhow::Error {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => anyhow::Error::new(ApiException::from(api_error))
            .context(format!("request failed with status {status}")),
        Err(_) => anyhow!("request failed with status {status}"),
    }
}

#[async_trait]
impl CurationApi for HttpCurationApi {
    async fn fetch_candidates(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>> {
        let url = self.endpoint(&["collections", collection.as_str(), "candidates"])?;
        self.get_page(url, &page_query(page)).await
    }

    async fn fetch_current_selection(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>> {
        let url = self.endpoint(&["collections", collection.as_str(), "selection"])?;
        self.get_page(url, &page_query(page)).await
    }

    async fn commit_selection(
        &self,
        collection: &CollectionKey,
        changes: &[ChangeEntry],
    ) -> Result<()> {
        let url = self.endpoint(&["collections", collection.as_str(), "selection"])?;
        let res = self
            .authorized(self.http.post(url.clone()))
            .json(&CommitSelectionRequest {
                changes: changes.to_vec(),
            })
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(res).await)
    }

    async fn fetch_gallery(
        &self,
        query: &GalleryQuery,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>> {
        let url = self.endpoint(&["gallery"])?;
        self.get_page(url, &query.query_pairs(page)).await
    }
}

#[async_trait]
impl SessionProvider for HttpCurationApi {
    async fn session(&self) -> Result<SessionInfo> {
        let url = self.endpoint(&["session"])?;
        let res = self
            .authorized(self.http.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        decode(res).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
