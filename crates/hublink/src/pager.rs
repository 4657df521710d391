//! Multi-page drains following `Link: rel="next"` relations.
//!
//! Pagination is strictly sequential: each page's continuation comes from
//! the previous response, so there is no concurrent fetching here. A drain
//! terminates when the server stops sending a next link, when an error
//! surfaces, or when the caller's cancellation flag trips. A failed page
//! mid-drain aborts with that error rather than returning a silently
//! truncated result set.

use std::collections::HashSet;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::cancel::CancelFlag;
use crate::descriptor::CallDescriptor;
use crate::engine::Engine;
use crate::error::{ApiError, Result};
use crate::http::HttpResponse;
use crate::link::parse_link_header;
use crate::normalize::{NormalizeContext, ResultRecord, normalize};

/// Decode one page body as a JSON array of items.
fn decode_items(page: &HttpResponse) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(&page.body)
        .map_err(|e| ApiError::decode(format!("invalid JSON page: {e}")))?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ApiError::decode(format!(
            "expected a JSON array page, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where drained records go: an owned vector or a live channel.
enum Sink<'a> {
    Collect(&'a mut Vec<ResultRecord>),
    Channel {
        tx: &'a mpsc::Sender<ResultRecord>,
        sent: &'a mut usize,
    },
}

impl Sink<'_> {
    /// Deliver one record. Returns false when the consumer is gone.
    async fn deliver(&mut self, record: ResultRecord) -> bool {
        match self {
            Sink::Collect(records) => {
                records.push(record);
                true
            }
            Sink::Channel { tx, sent } => {
                if tx.send(record).await.is_err() {
                    return false;
                }
                **sent += 1;
                true
            }
        }
    }
}

impl Engine {
    /// Fetch every page of a collection endpoint into one vector.
    ///
    /// The sequence is finite and not restartable: to re-enumerate, build a
    /// fresh descriptor and drain again. On any terminal error the whole
    /// drain fails; records from earlier pages are discarded. Use
    /// [`Engine::drain_streaming`] when partial delivery matters.
    pub async fn drain(
        &self,
        descriptor: &CallDescriptor,
        context: &NormalizeContext,
        cancel: Option<&CancelFlag>,
    ) -> Result<Vec<ResultRecord>> {
        let mut records = Vec::new();
        self.drain_inner(descriptor, context, cancel, Sink::Collect(&mut records))
            .await?;
        Ok(records)
    }

    /// Fetch pages and send records through a channel as each page lands.
    ///
    /// Downstream processing can start before later pages are fetched.
    /// Returns the number of records sent. If the receiver goes away the
    /// drain stops early and returns the count so far; a terminal API error
    /// still surfaces as an error even after records were delivered.
    pub async fn drain_streaming(
        &self,
        descriptor: &CallDescriptor,
        context: &NormalizeContext,
        tx: mpsc::Sender<ResultRecord>,
        cancel: Option<&CancelFlag>,
    ) -> Result<usize> {
        let mut sent = 0usize;
        self.drain_inner(
            descriptor,
            context,
            cancel,
            Sink::Channel {
                tx: &tx,
                sent: &mut sent,
            },
        )
        .await?;
        Ok(sent)
    }

    /// Shared page loop.
    async fn drain_inner(
        &self,
        descriptor: &CallDescriptor,
        context: &NormalizeContext,
        cancel: Option<&CancelFlag>,
        mut sink: Sink<'_>,
    ) -> Result<()> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = descriptor.clone();
        let mut page_number = 1u32;

        loop {
            if let Some(flag) = cancel
                && flag.is_cancelled()
            {
                tracing::debug!(page = page_number, "drain canceled before page request");
                return Err(ApiError::canceled());
            }

            let request = self.build(&current)?;
            visited.insert(request.url.clone());

            let page = self.send_with_retry(&request).await?;
            let items = decode_items(&page)?;
            let count = items.len();

            let next = page
                .header("link")
                .map(parse_link_header)
                .unwrap_or_default()
                .next;

            tracing::debug!(
                page = page_number,
                count,
                has_next = next.is_some(),
                url = %request.url,
                "fetched page"
            );

            for item in items {
                if !sink.deliver(normalize(item, context)).await {
                    tracing::debug!("drain receiver dropped, stopping early");
                    return Ok(());
                }
            }

            match next {
                None => return Ok(()),
                Some(url) if visited.contains(&url) => {
                    // A server echoing an already-seen link would otherwise
                    // spin forever.
                    tracing::warn!(%url, "pagination link cycle detected, stopping");
                    return Ok(());
                }
                Some(url) => {
                    current = current.for_page_url(url);
                    page_number += 1;
                }
            }
        }
    }
}
