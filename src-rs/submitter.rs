use std::sync::Arc;

use crate::client::{ComputationParams, SubmittedHandle, TaskApi};
use crate::error::SubmissionError;

/// Issues the start request for a computation.
pub struct TaskSubmitter {
    api: Arc<dyn TaskApi>,
}

impl TaskSubmitter {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self { api }
    }

    /// Submit `params` and return the single handle to poll.
    ///
    /// Nothing is sent when the parameters are incomplete. On error the
    /// caller must not start a poller.
    pub async fn submit(&self, params: &ComputationParams) -> Result<SubmittedHandle, SubmissionError> {
        validate(params)?;

        let response = self.api.start_task(params).await.map_err(|e| {
            tracing::warn!(client_id = params.client_id, error = %e, "Task submission failed");
            SubmissionError::from(e)
        })?;

        let handle = response.into_handle().ok_or(SubmissionError::MissingHandle)?;
        tracing::info!(
            client_id = params.client_id,
            year = params.year,
            month = params.month,
            kind = ?params.kind,
            handle = ?handle,
            "Computation submitted",
        );
        Ok(handle)
    }
}

fn validate(params: &ComputationParams) -> Result<(), SubmissionError> {
    if params.client_id <= 0 {
        return Err(SubmissionError::InvalidParams(
            "please enter a client id".to_string(),
        ));
    }
    if !(1..=12).contains(&params.month) {
        return Err(SubmissionError::InvalidParams(format!(
            "month must be between 1 and 12, got {}",
            params.month
        )));
    }
    Ok(())
}
