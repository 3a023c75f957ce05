//! Mock surfaces shared by the integration tests.

use std::collections::HashMap;

use ctxprop_core::config::CookieDefaults;
use ctxprop_core::json::JsonTree;
use ctxprop_core::source::{
    DownstreamResponse, OutboundSurface, RequestSurface, ResponseSurface,
};

#[derive(Default)]
pub struct MockRequest {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub cookies: HashMap<String, String>,
    pub path: String,
    pub session: HashMap<String, String>,
    pub attributes: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

impl MockRequest {
    pub fn new() -> Self {
        MockRequest {
            path: "/".to_string(),
            ..MockRequest::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_session(mut self, key: &str, value: &str) -> Self {
        self.session.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_form(mut self, key: &str, value: &str) -> Self {
        self.form.insert(key.to_string(), value.to_string());
        self
    }
}

impl RequestSurface for MockRequest {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session_attribute(&self, key: &str) -> Option<String> {
        self.session.get(key).cloned()
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).cloned()
    }

    fn form_param(&self, name: &str) -> Option<String> {
        self.form.get(name).cloned()
    }
}

#[derive(Default)]
pub struct MockResponse {
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<String>,
    pub attributes: HashMap<String, String>,
}

impl MockResponse {
    pub fn new() -> Self {
        MockResponse::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl ResponseSurface for MockResponse {
    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn add_cookie(&mut self, name: &str, value: &str, defaults: &CookieDefaults) {
        self.cookies
            .push(format!("{name}={value}; Path={}", defaults.path));
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }
}

#[derive(Default)]
pub struct MockOutbound {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl MockOutbound {
    pub fn new() -> Self {
        MockOutbound::default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl OutboundSurface for MockOutbound {
    fn insert_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn add_query_param(&mut self, name: &str, value: &str) {
        self.query.push((name.to_string(), value.to_string()));
    }

    fn add_cookie(&mut self, name: &str, value: &str) {
        self.cookies.push((name.to_string(), value.to_string()));
    }
}

pub struct MockDownstream {
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl MockDownstream {
    pub fn new() -> Self {
        MockDownstream {
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl DownstreamResponse for MockDownstream {
    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn body_tree(&self) -> Option<&dyn JsonTree> {
        self.body.as_ref().map(|v| v as &dyn JsonTree)
    }
}
