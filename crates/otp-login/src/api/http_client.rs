use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    api::{
        OtpApi, OtpApiError, OtpErrorApiResponse, SendCodeApiResponse, SendCodeRequest,
        VerifyCodeApiResponse, VerifyCodeRequest,
    },
    settings::ClientSettings,
};

/// [`OtpApi`] over HTTP. Both actions are POSTed as JSON to the same route.
#[derive(Clone, Debug)]
pub struct HttpOtpApi {
    client: reqwest::Client,
    url: String,
}

impl HttpOtpApi {
    /// Builds a client with its own connection pool.
    pub fn new(settings: &ClientSettings) -> Result<Self, OtpApiError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    /// Reuses an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, settings: &ClientSettings) -> Self {
        Self {
            client,
            url: settings.otp_url(),
        }
    }

    async fn post<B, T>(&self, body: &B) -> Result<T, OtpApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response: reqwest::Response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        // The body is read as text first so a non-JSON error page still yields a useful message.
        let text = response.text().await?;
        debug!(status = status.as_u16(), "OTP endpoint returned an error");

        match serde_json::from_str::<OtpErrorApiResponse>(&text) {
            Ok(mut body) => {
                body.retry_after = body.retry_after.or(retry_after);
                Err(OtpApiError::Endpoint {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(_) => Err(OtpApiError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("Request failed with status {}", status.as_u16()),
                retry_after,
            }),
        }
    }
}

#[async_trait]
impl OtpApi for HttpOtpApi {
    async fn send_code(
        &self,
        request: SendCodeRequest,
    ) -> Result<SendCodeApiResponse, OtpApiError> {
        self.post(&request).await
    }

    async fn verify_code(
        &self,
        request: VerifyCodeRequest,
    ) -> Result<VerifyCodeApiResponse, OtpApiError> {
        self.post(&request).await
    }
}
