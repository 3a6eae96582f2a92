use async_trait::async_trait;
use http::header::CONTENT_TYPE;

use gbridge_transform::generate_content::openai_chat2gemini::{FetchedMedia, MediaFetcher};

/// Plain GET through the shared outbound client.
#[derive(Clone)]
pub struct WreqMediaFetcher {
    client: wreq::Client,
}

impl WreqMediaFetcher {
    pub fn new(client: wreq::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for WreqMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|err| err.to_string())?;
        Ok(FetchedMedia {
            status,
            content_type,
            body,
        })
    }
}
