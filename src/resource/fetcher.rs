//! Resource Fetcher
//!
//! Pagination unwinding for list operations.

use super::operation::Operation;
use crate::api::Client;
use crate::config::CallOptions;
use crate::error::Result;
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// Query parameter carrying the continuation token
pub const PAGE_TOKEN_PARAM: &str = "pageToken";

/// Result of paginated fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Page<O> {
    pub items: Vec<O>,
    pub next_token: Option<String>,
}

/// Fetch all items (auto-paginate), concatenated in wire order
pub async fn fetch_all<I, O: DeserializeOwned>(
    client: &Client,
    op: &Operation<I, O>,
    input: &I,
    options: &CallOptions,
) -> Result<Vec<O>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = fetch_page(client, op, input, page_token.as_deref(), options).await?;
        pages += 1;
        all_items.extend(page.items);

        let Some(token) = page.next_token else {
            break;
        };
        // A token seen before means the server is cycling
        if !seen_tokens.insert(token.clone()) {
            tracing::warn!("{}: server repeated page token {:?}, stopping", op.name, token);
            break;
        }
        page_token = Some(token);
    }

    tracing::debug!("{}: fetched {} items in {} pages", op.name, all_items.len(), pages);
    Ok(all_items)
}

/// Fetch one page of items
pub async fn fetch_page<I, O: DeserializeOwned>(
    client: &Client,
    op: &Operation<I, O>,
    input: &I,
    page_token: Option<&str>,
    options: &CallOptions,
) -> Result<Page<O>> {
    let mut request = op.build(input)?;
    if let Some(token) = page_token {
        request.set_param(PAGE_TOKEN_PARAM, token);
    }

    let envelope = client.execute(request, options).await?;
    Ok(Page {
        items: envelope.decode_items()?,
        next_token: envelope.next_page_token().map(str::to_string),
    })
}
