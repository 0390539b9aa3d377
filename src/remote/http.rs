//! reqwest-backed implementation of the remote scoring API.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::ScoreApi;
use super::error::{ApiError, ApiResult};
use super::models::{
    AdvanceInningRequest, ChangePitcherRequest, CreateAtBatRequest, CreatedResponse,
    EndGameRequest, InningResponse, LogPitchRequest, RecordPlayRequest, StartGameRequest,
    UpdateAtBatRequest, UpdateScoreRequest,
};

/// HTTP client for the scoring backend.
#[derive(Clone)]
pub struct HttpScoreApi {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl HttpScoreApi {
    /// Build a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.map(Arc::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        if let Some(ref token) = self.token {
            builder.bearer_auth(token.as_ref())
        } else {
            builder
        }
    }

    async fn send_unit<B>(&self, method: Method, path: String, body: &B) -> ApiResult<()>
    where
        B: ?Sized + Serialize,
    {
        let response = self
            .request(method, &path)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::RequestStatus {
                path,
                status: response.status(),
            })
        }
    }

    async fn send_json<B, T>(&self, method: Method, path: String, body: &B) -> ApiResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .request(method, &path)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => {
                response
                    .json::<T>()
                    .await
                    .map_err(|source| ApiError::DecodeResponse { path, source })
            }
            status => Err(ApiError::RequestStatus { path, status }),
        }
    }

    async fn get_json<T>(&self, path: String) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => {
                response
                    .json::<T>()
                    .await
                    .map_err(|source| ApiError::DecodeResponse { path, source })
            }
            status => Err(ApiError::RequestStatus { path, status }),
        }
    }
}

impl ScoreApi for HttpScoreApi {
    fn start_game(&self, request: StartGameRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move { api.send_unit(Method::POST, "games".into(), &request).await })
    }

    fn end_game(&self, request: EndGameRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("games/{}/end", request.game_id);
            api.send_unit(Method::POST, path, &request).await
        })
    }

    fn create_at_bat(
        &self,
        request: CreateAtBatRequest,
    ) -> BoxFuture<'static, ApiResult<CreatedResponse>> {
        let api = self.clone();
        Box::pin(async move { api.send_json(Method::POST, "at-bats".into(), &request).await })
    }

    fn update_at_bat(&self, request: UpdateAtBatRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("at-bats/{}", request.at_bat_id);
            api.send_unit(Method::PUT, path, &request).await
        })
    }

    fn log_pitch(
        &self,
        request: LogPitchRequest,
    ) -> BoxFuture<'static, ApiResult<CreatedResponse>> {
        let api = self.clone();
        Box::pin(async move { api.send_json(Method::POST, "pitches".into(), &request).await })
    }

    fn record_play(&self, request: RecordPlayRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move { api.send_unit(Method::POST, "plays".into(), &request).await })
    }

    fn advance_inning(&self, request: AdvanceInningRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("games/{}/advance-inning", request.game_id);
            api.send_unit(Method::POST, path, &request).await
        })
    }

    fn get_current_inning(&self, game_id: Uuid) -> BoxFuture<'static, ApiResult<InningResponse>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("games/{game_id}/current-inning");
            api.get_json(path).await
        })
    }

    fn change_pitcher(&self, request: ChangePitcherRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("games/{}/pitcher", request.game_id);
            api.send_unit(Method::POST, path, &request).await
        })
    }

    fn update_score(&self, request: UpdateScoreRequest) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("games/{}/score", request.game_id);
            api.send_unit(Method::PUT, path, &request).await
        })
    }

    fn ping(&self) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let path = "health".to_string();
            let response = api.request(Method::GET, &path).send().await.map_err(|source| {
                ApiError::RequestSend {
                    path: path.clone(),
                    source,
                }
            })?;

            match response.status() {
                status if status.is_success() => Ok(()),
                StatusCode::NOT_FOUND => Ok(()),
                status => Err(ApiError::RequestStatus { path, status }),
            }
        })
    }
}
