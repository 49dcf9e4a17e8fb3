//! Request batching.
//!
//! `Batch` only queues built requests and hands them to
//! `Transport::execute_batch` in one go; how they travel (one `$batch`
//! round trip or sequential calls) is the transport's business.

use crate::client::SpClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};

/// Queue of requests executed together.
pub struct Batch<'a, T> {
    client: &'a SpClient<T>,
    queued: Vec<Result<HttpRequest, ApiError>>,
}

impl<'a, T: Transport> Batch<'a, T> {
    pub(crate) fn new(client: &'a SpClient<T>) -> Self {
        Self {
            client,
            queued: Vec::new(),
        }
    }

    pub fn get(mut self, url: &str) -> Self {
        self.queued.push(self.client.build_get(url));
        self
    }

    pub fn post(mut self, url: &str, body: &str) -> Self {
        self.queued.push(self.client.build_post(url, Some(body)));
        self
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Sends every valid request and returns one envelope per queued
    /// request, in queue order. Requests that failed to build are reported
    /// locally and never sent.
    pub fn execute(self) -> Vec<Envelope> {
        let requests: Vec<HttpRequest> = self.queued.iter().filter_map(|r| r.as_ref().ok().cloned()).collect();
        let mut responses = self.client.transport().execute_batch(&requests).into_iter();

        self.queued
            .into_iter()
            .map(|queued| match queued {
                Err(err) => Envelope::local_failure(err),
                Ok(_) => match responses.next() {
                    Some(Ok(response)) => Envelope::from_response(response),
                    Some(Err(err)) => Envelope::from_transport_error(err),
                    None => Envelope::local_failure(ApiError::Transport(
                        "batch returned fewer responses than requests".to_string(),
                    )),
                },
            })
            .collect()
    }
}
