//! Operation definitions
//!
//! Service bindings are data: an [`Operation`] names the HTTP method, the
//! path template and how an input fills a [`Request`]. The client runs them
//! through the shared pipeline.

use super::fetcher;
use crate::api::{Client, Request};
use crate::config::CallOptions;
use crate::error::Result;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Fills a request from an operation input
pub type Encode<I> = fn(&I, &mut Request) -> Result<()>;

/// One API operation taking `I` and yielding items of type `O`
pub struct Operation<I, O> {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub encode: Encode<I>,
    output: PhantomData<fn(&I) -> O>,
}

impl<I, O> Operation<I, O> {
    pub const fn new(name: &'static str, method: Method, path: &'static str, encode: Encode<I>) -> Self {
        Self {
            name,
            method,
            path,
            encode,
            output: PhantomData,
        }
    }

    /// Build a fresh request for `input`
    pub fn build(&self, input: &I) -> Result<Request> {
        let mut request = Request::new(self.method.clone(), self.path);
        (self.encode)(input, &mut request)?;
        Ok(request)
    }
}

/// Encoder for operations without input
pub fn no_input<I>(_: &I, _: &mut Request) -> Result<()> {
    Ok(())
}

impl<I, O> std::fmt::Debug for Operation<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

impl Client {
    /// Run `op` and decode the first item. No items is `Ok(None)`.
    pub async fn call_one<I, O: DeserializeOwned>(
        &self,
        op: &Operation<I, O>,
        input: &I,
        options: &CallOptions,
    ) -> Result<Option<O>> {
        let request = op.build(input)?;
        tracing::debug!("{}: {} {}", op.name, op.method, op.path);
        self.execute(request, options).await?.first()
    }

    /// Run `op` and decode every item of the single response
    pub async fn call_many<I, O: DeserializeOwned>(
        &self,
        op: &Operation<I, O>,
        input: &I,
        options: &CallOptions,
    ) -> Result<Vec<O>> {
        let request = op.build(input)?;
        tracing::debug!("{}: {} {}", op.name, op.method, op.path);
        self.execute(request, options).await?.decode_items()
    }

    /// Run `op` page by page until the server stops returning a page token
    pub async fn call_all<I, O: DeserializeOwned>(
        &self,
        op: &Operation<I, O>,
        input: &I,
        options: &CallOptions,
    ) -> Result<Vec<O>> {
        fetcher::fetch_all(self, op, input, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::required;
    use crate::error::Error;
    use crate::field::Field;

    struct Input {
        id: Field<String>,
        limit: Field<u32>,
    }

    fn encode_get(input: &Input, r: &mut Request) -> Result<()> {
        r.path_param("thingId", required(&input.id, "thingId")?)?;
        r.param("limit", &input.limit);
        Ok(())
    }

    const GET_THING: Operation<Input, serde_json::Value> =
        Operation::new("GetThing", Method::GET, "/things/{thingId}", encode_get);

    #[test]
    fn test_build_fills_path_and_query() {
        let input = Input {
            id: Field::Set("t-1".to_string()),
            limit: Field::Set(10),
        };
        let request = GET_THING.build(&input).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/things/t-1");
        assert_eq!(request.query.get("limit"), Some("10"));
    }

    #[test]
    fn test_build_fails_without_required_input() {
        let input = Input {
            id: Field::Absent,
            limit: Field::Absent,
        };
        assert!(matches!(GET_THING.build(&input), Err(Error::Request(_))));
    }

    #[test]
    fn test_requests_are_built_fresh() {
        let first = GET_THING
            .build(&Input {
                id: Field::Set("a".to_string()),
                limit: Field::Set(1),
            })
            .unwrap();
        let second = GET_THING
            .build(&Input {
                id: Field::Set("b".to_string()),
                limit: Field::Absent,
            })
            .unwrap();
        assert_eq!(first.path, "/things/a");
        assert_eq!(second.path, "/things/b");
        assert!(second.query.is_empty());
    }
}
