use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug)]
pub enum APIError {
    Network,
    MalformedResponse,
    UnexpectedStatusCode(StatusCode),
}

impl APIError {
    /// HTTP status for server-side rejections; `None` for transport and
    /// decoding failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatusCode(status) => Some(status.as_u16()),
            _ => None,
        }
    }
}

pub type APIResponse<T> = Result<T, APIError>;

pub(crate) struct BaseClient {
    client: Client,
    address: String,
}

impl BaseClient {
    pub fn new(address: String) -> Self {
        Self {
            client: Client::new(),
            address,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let url = format!("{}/api/v1/{}", self.address, path);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let res = request.send().await.map_err(|_| APIError::Network)?;
        let status = res.status();
        if status != expected_status_code {
            return Err(APIError::UnexpectedStatusCode(status));
        }

        res.json::<T>().await.map_err(|_| APIError::MalformedResponse)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(Method::GET, path, None, expected_status_code)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        body: B,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let body = serde_json::to_value(body).map_err(|_| APIError::MalformedResponse)?;
        self.send(Method::POST, path, Some(body), expected_status_code)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        body: B,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let body = serde_json::to_value(body).map_err(|_| APIError::MalformedResponse)?;
        self.send(Method::PUT, path, Some(body), expected_status_code)
            .await
    }
}
