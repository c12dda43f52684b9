//! Board repository collaborator (spec §4.K): retrieving the assets an
//! Execution Tracker resolves an [`crate::output::AssetRef`] to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub board_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDto {
    pub image_name: String,
    pub board_id: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// The external boundary to the asset store an [`crate::output::AssetRef`]
/// is resolved against.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn get_board(&self, board_id: &str) -> Result<Board>;
    async fn list_images(&self, board_id: &str) -> Result<Vec<ImageDto>>;
    async fn get_image_dto(&self, image_name: &str) -> Result<ImageDto>;
    async fn download_image(&self, image_name: &str) -> Result<Vec<u8>>;
}

/// Default `reqwest`-backed [`BoardRepository`].
pub struct ReqwestBoardRepository {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ReqwestBoardRepository {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl BoardRepository for ReqwestBoardRepository {
    async fn get_board(&self, board_id: &str) -> Result<Board> {
        let request = self.authed(
            self.client
                .get(format!("{}/api/v1/boards/{board_id}", self.base_url)),
        );
        let response = request.send().await.map_err(|e| Error::Transport(e.to_string()))?;
        response.json().await.map_err(|e| Error::Transport(e.to_string()))
    }

    async fn list_images(&self, board_id: &str) -> Result<Vec<ImageDto>> {
        let request = self.authed(
            self.client
                .get(format!("{}/api/v1/boards/{board_id}/images", self.base_url)),
        );
        let response = request.send().await.map_err(|e| Error::Transport(e.to_string()))?;
        response.json().await.map_err(|e| Error::Transport(e.to_string()))
    }

    async fn get_image_dto(&self, image_name: &str) -> Result<ImageDto> {
        let request = self.authed(
            self.client
                .get(format!("{}/api/v1/images/{image_name}", self.base_url)),
        );
        let response = request.send().await.map_err(|e| Error::Transport(e.to_string()))?;
        response.json().await.map_err(|e| Error::Transport(e.to_string()))
    }

    async fn download_image(&self, image_name: &str) -> Result<Vec<u8>> {
        let request = self.authed(self.client.get(format!(
            "{}/api/v1/images/{image_name}/full",
            self.base_url
        )));
        let response = request.send().await.map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::AssetNotFound(image_name.to_string()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Transport(e.to_string()))
    }
}
