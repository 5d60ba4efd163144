//! [`TaskApi`] over the dashboard's REST endpoints, using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{
    ComputationKind, ComputationParams, GroupHandle, GroupProgress, ResultsSnapshot, StartTaskResponse,
    TaskApi, TaskHandle, TaskStatusResponse,
};
use crate::error::TransportError;

pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    /// * `base_url` - API root, e.g. `http://127.0.0.1:8000/api/v1`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn start_task(&self, params: &ComputationParams) -> Result<StartTaskResponse, TransportError> {
        let path = match params.kind {
            ComputationKind::MonthlyBreakdown => "/co2/monthly-co2/start",
            ComputationKind::MonthlySummary => "/co2/monthly-co2/summary/start",
        };
        let response = self.client.post(self.url(path)).json(params).send().await?;
        Self::parse(response).await
    }

    async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatusResponse, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{}/status", task)))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn task_result(&self, task: &TaskHandle) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{}/result", task)))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn group_progress(&self, group: &GroupHandle) -> Result<GroupProgress, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/groups/{}/progress", group)))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn results(&self, params: &ComputationParams) -> Result<ResultsSnapshot, TransportError> {
        let response = self
            .client
            .get(self.url("/co2/monthly-co2"))
            .query(params)
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = HttpTaskApi::with_client(reqwest::Client::new(), "http://localhost:8000/api/v1/");
        assert_eq!(api.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(api.url("/tasks/x/status"), "http://localhost:8000/api/v1/tasks/x/status");
    }
}
