//! Request building
//!
//! A [`Request`] is built fresh for every call: method, a path template with
//! `{name}` placeholders, ordered query parameters with unique keys, extra
//! headers, and an optional JSON body.

use crate::error::{Error, Result};
use crate::field::Field;
use crate::selective::{self, Resource};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::fmt::Display;
use url::Url;

/// Ordered query parameters; setting an existing key replaces its value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One API request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Query,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Replace the `{name}` placeholder with the url-encoded `value`
    pub fn path_param(&mut self, name: &str, value: impl Display) -> Result<()> {
        let placeholder = format!("{{{name}}}");
        if !self.path.contains(&placeholder) {
            return Err(Error::Request(format!(
                "path {:?} has no parameter {:?}",
                self.path, name
            )));
        }
        let value = value.to_string();
        if value.is_empty() {
            return Err(Error::Request(format!("path parameter {name:?} is empty")));
        }
        self.path = self.path.replace(&placeholder, &urlencoding::encode(&value));
        Ok(())
    }

    /// Add a query parameter from a field; only `Set` values contribute
    pub fn param<T: Display>(&mut self, key: &str, value: &Field<T>) {
        if let Field::Set(v) = value {
            self.query.set(key, v.to_string());
        }
    }

    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.query.set(key, value.into());
    }

    pub fn header(&mut self, name: &str, value: &str) -> Result<()> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Request(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Request(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(header, value);
        Ok(())
    }

    /// Selectively encode `resource` as the JSON body
    pub fn body<R: Resource + ?Sized>(&mut self, resource: &R) -> Result<()> {
        self.body = Some(selective::to_vec(resource)?);
        Ok(())
    }

    /// Full URL under `base`. Fails if a path placeholder was never filled.
    pub fn url(&self, base: &Url) -> Result<Url> {
        if let Some(start) = self.path.find('{') {
            let name: String = self.path[start + 1..].chars().take_while(|c| *c != '}').collect();
            return Err(Error::Request(format!("missing path parameter {name:?}")));
        }

        let raw = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let mut url =
            Url::parse(&raw).map_err(|e| Error::Request(format!("invalid URL {raw:?}: {e}")))?;

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// Borrow a required input value, or fail naming the parameter
pub fn required<'a, T>(value: &'a Field<T>, name: &str) -> Result<&'a T> {
    value
        .value()
        .ok_or_else(|| Error::Request(format!("missing required parameter {name:?}")))
}
