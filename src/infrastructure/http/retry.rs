//! Retry with exponential backoff for idempotent HTTP requests.

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::future::retry;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

use crate::infrastructure::config::HttpConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Retries after the first attempt.
  max_retries: u32,
  backoff: Duration,
}

/// Why a single attempt did not produce a final response.
enum Attempt {
  Status(Response),
  Transport(reqwest::Error),
  NotCloneable,
}

impl RetryPolicy {
  pub fn new(max_retries: u32, backoff: Duration) -> Self {
    Self {
      max_retries,
      backoff,
    }
  }

  pub fn from_config(config: &HttpConfig) -> Self {
    Self::new(config.max_retries, config.backoff())
  }

  /// `backoff * 2^(attempt - 1)` for retry number `attempt` (1-based).
  pub fn backoff_duration(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self.backoff.saturating_mul(factor)
  }

  fn schedule(&self) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
      .with_initial_interval(self.backoff)
      .with_randomization_factor(0.0)
      .with_multiplier(2.0)
      .with_max_interval(self.backoff_duration(self.max_retries.max(1)))
      .with_max_elapsed_time(None)
      .build()
  }

  /// Sends the request, retrying idempotent ones on transient failures.
  ///
  /// Requests whose body cannot be cloned (multipart streams) are sent once.
  pub async fn send(
    &self,
    request: RequestBuilder,
    idempotent: bool,
  ) -> Result<Response, reqwest::Error> {
    if !idempotent {
      return request.send().await;
    }

    let max_retries = self.max_retries;
    let mut attempt = 0u32;

    let outcome = retry(self.schedule(), || {
      let current = attempt;
      attempt += 1;
      let next = request.try_clone();

      async move {
        let Some(next) = next else {
          return Err(backoff::Error::permanent(Attempt::NotCloneable));
        };
        let can_retry = current < max_retries;

        match next.send().await {
          Ok(response) if can_retry && is_retryable_status(response.status()) => {
            tracing::warn!(
              "{} returned {}, retrying ({}/{})",
              response.url(),
              response.status(),
              current + 1,
              max_retries
            );
            Err(backoff::Error::transient(Attempt::Status(response)))
          }
          Ok(response) => Ok(response),
          Err(e) if can_retry && is_retryable_error(&e) => {
            tracing::warn!(
              "Request failed: {}, retrying ({}/{})",
              e,
              current + 1,
              max_retries
            );
            Err(backoff::Error::transient(Attempt::Transport(e)))
          }
          Err(e) => Err(backoff::Error::permanent(Attempt::Transport(e))),
        }
      }
    })
    .await;

    match outcome {
      Ok(response) | Err(Attempt::Status(response)) => Ok(response),
      Err(Attempt::Transport(e)) => Err(e),
      Err(Attempt::NotCloneable) => request.send().await,
    }
  }
}

/// Gateway failures that are worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
  matches!(
    status,
    StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
  )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
  error.is_connect() || error.is_timeout()
}
