//! Adapters binding the core's surface traits to http/axum types.

use std::collections::HashMap;

use axum::body::Body;
use axum::response::Response;
use cookie::{Cookie, SameSite};
use ctxprop_core::config::CookieDefaults;
use ctxprop_core::source::{RequestSurface, ResponseSurface};
use http::header::{COOKIE, SET_COOKIE};
use http::{Extensions, HeaderMap, HeaderValue, Uri};
use tracing::debug;

use crate::extract::{FormParams, RequestAttributes, SessionAttributes};

/// Read view over an inbound axum request.
pub(crate) struct HttpRequestSurface<'a> {
    headers: &'a HeaderMap,
    uri: &'a Uri,
    extensions: &'a Extensions,
}

impl<'a> HttpRequestSurface<'a> {
    pub(crate) fn new(headers: &'a HeaderMap, uri: &'a Uri, extensions: &'a Extensions) -> Self {
        HttpRequestSurface {
            headers,
            uri,
            extensions,
        }
    }
}

impl RequestSurface for HttpRequestSurface<'_> {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    fn cookie(&self, name: &str) -> Option<String> {
        for header in self.headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            for cookie in Cookie::split_parse(raw).flatten() {
                if cookie.name() == name {
                    return Some(cookie.value().to_string());
                }
            }
        }
        None
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn session_attribute(&self, key: &str) -> Option<String> {
        self.extensions
            .get::<SessionAttributes>()
            .and_then(|session| session.get(key))
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.extensions
            .get::<RequestAttributes>()
            .and_then(|attributes| attributes.get(key))
    }

    fn form_param(&self, name: &str) -> Option<String> {
        self.extensions
            .get::<FormParams>()
            .and_then(|form| form.get(name))
    }
}

/// Attributes the framework sets on the outgoing response, readable by
/// later layers through the response extensions.
#[derive(Clone, Debug, Default)]
pub struct ResponseAttributes(pub HashMap<String, String>);

impl ResponseAttributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Write view over the outgoing response for stage 4.
pub(crate) struct HttpResponseSurface<'a> {
    response: &'a mut Response<Body>,
}

impl<'a> HttpResponseSurface<'a> {
    pub(crate) fn new(response: &'a mut Response<Body>) -> Self {
        HttpResponseSurface { response }
    }

    fn header_value(name: &str, value: &str) -> Option<(http::HeaderName, HeaderValue)> {
        let name = match http::HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                debug!(header = name, "invalid response header name");
                return None;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                debug!(header = %name, "invalid response header value");
                return None;
            }
        };
        Some((name, value))
    }
}

impl ResponseSurface for HttpResponseSurface<'_> {
    fn has_header(&self, name: &str) -> bool {
        self.response.headers().contains_key(name)
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::header_value(name, value) {
            self.response.headers_mut().insert(name, value);
        }
    }

    fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = Self::header_value(name, value) {
            self.response.headers_mut().append(name, value);
        }
    }

    fn add_cookie(&mut self, name: &str, value: &str, defaults: &CookieDefaults) {
        let mut builder = Cookie::build((name.to_string(), value.to_string()))
            .path(defaults.path.clone())
            .http_only(defaults.http_only)
            .secure(defaults.secure)
            .same_site(parse_same_site(&defaults.same_site));
        if let Some(domain) = defaults.domain.clone() {
            builder = builder.domain(domain);
        }
        let mut rendered = builder.build().to_string();
        if let Some(max_age) = defaults.max_age_seconds {
            rendered.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Ok(value) = HeaderValue::from_str(&rendered) {
            self.response.headers_mut().append(SET_COOKIE, value);
        }
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        let extensions = self.response.extensions_mut();
        if extensions.get::<ResponseAttributes>().is_none() {
            extensions.insert(ResponseAttributes::default());
        }
        if let Some(attributes) = extensions.get_mut::<ResponseAttributes>() {
            attributes.0.insert(key.to_string(), value.to_string());
        }
    }
}

fn parse_same_site(value: &str) -> SameSite {
    if value.eq_ignore_ascii_case("strict") {
        SameSite::Strict
    } else if value.eq_ignore_ascii_case("none") {
        SameSite::None
    } else {
        SameSite::Lax
    }
}
