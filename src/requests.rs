use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, ClientBuilder};

use crate::{
    config::FetchEnv,
    fetch_error::FetchError,
    retry::{Outcome, RetryPolicy, RetryState, classify_status},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Get { url: String },
    PostForm { url: String, form: Vec<(String, String)> },
}

impl FetchRequest {
    pub fn url(&self) -> &str {
        match self {
            FetchRequest::Get { url } | FetchRequest::PostForm { url, .. } => url,
        }
    }

    fn method(&self) -> &'static str {
        match self {
            FetchRequest::Get { .. } => "GET",
            FetchRequest::PostForm { .. } => "POST",
        }
    }
}

/// How one attempt ended when it didn't produce a body.
enum AttemptError {
    Retryable(String),
    Fatal(FetchError),
}

/// Sequential HTTP client: one request in flight, retried with backoff, and
/// a politeness pause after every success.
pub struct RequestClient {
    client: Client,
    retry: RetryPolicy,
    polite_delay: Duration,
}

impl RequestClient {
    pub fn new(env: &FetchEnv, retry: RetryPolicy, polite_delay: Duration) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .user_agent(env.user_agent())
            .timeout(env.timeout())
            .build()?;
        Ok(Self {
            client,
            retry,
            polite_delay,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch a body, retrying 429, 5xx and transport failures until the
    /// retry budget runs out.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let mut state = RetryState::Attempting(1);
        let mut last_error = String::new();
        loop {
            let RetryState::Attempting(attempt) = state else {
                return Err(FetchError::Exhausted {
                    url: request.url().to_string(),
                    attempts: self.retry.max_attempts,
                    last: last_error,
                });
            };

            match self.attempt(request).await {
                Ok(body) => {
                    debug!("{} {} ok ({} bytes)", request.method(), request.url(), body.len());
                    tokio::time::sleep(self.polite_delay).await;
                    return Ok(body);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(reason)) => {
                    state = self.retry.step(attempt, Outcome::Retryable);
                    if let RetryState::Attempting(_) = state {
                        let wait = self.retry.jittered_backoff(attempt, &mut rand::rng());
                        warn!(
                            "{} {} failed ({}), attempt {}/{}, retrying in {:?}",
                            request.method(),
                            request.url(),
                            reason,
                            attempt,
                            self.retry.max_attempts,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                    }
                    last_error = reason;
                }
            }
        }
    }

    async fn attempt(&self, request: &FetchRequest) -> Result<String, AttemptError> {
        let builder = match request {
            FetchRequest::Get { url } => self.client.get(url),
            FetchRequest::PostForm { url, form } => self.client.post(url).form(form),
        };
        let response = builder
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        match classify_status(status) {
            Outcome::Success => response
                .text()
                .await
                .map_err(|e| AttemptError::Retryable(e.to_string())),
            Outcome::Retryable => Err(AttemptError::Retryable(format!("HTTP {}", status.as_u16()))),
            Outcome::Fatal => Err(AttemptError::Fatal(FetchError::Status {
                url: request.url().to_string(),
                status: status.as_u16(),
            })),
        }
    }
}
