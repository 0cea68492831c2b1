//! Virtual page routing.
//!
//! A preview request names a unit either by query parameters
//! (`?wp_vrt_type=block&wp_vrt_slug=core-paragraph`) or by path
//! (`/wp-vrt/block/core-paragraph/outline`). The router resolves the unit's
//! markup through its registry and hands it to the [`Renderer`]. Failures
//! become small HTML error pages with the matching status.

use log::debug;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::dynamic::RenderContext;
use crate::registry::UnitKind;
use crate::render::{escape_html, Renderer};
use crate::{Error, Result, Vrt};

pub const QUERY_TYPE: &str = "wp_vrt_type";
pub const QUERY_SLUG: &str = "wp_vrt_slug";
pub const QUERY_VARIATION: &str = "wp_vrt_variation";

/// A parsed preview request. The type is kept raw so an unknown one can be
/// answered with a 400 rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub kind: String,
    pub slug: String,
    pub variation: Option<String>,
}

impl RouteRequest {
    /// Parse a request target (path plus optional query). `None` means the
    /// target is not a preview request at all.
    pub fn parse(target: &str, prefix: &str) -> Option<Self> {
        let url = parse_target(target)?;

        let query = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };
        if let Some(kind) = query(QUERY_TYPE).filter(|k| !k.is_empty()) {
            return Some(Self {
                kind,
                slug: query(QUERY_SLUG).unwrap_or_default(),
                variation: query(QUERY_VARIATION).filter(|v| !v.is_empty()),
            });
        }

        let path = url.path().trim_matches('/');
        let rest = path.strip_prefix(prefix)?.strip_prefix('/')?;
        let parts: Vec<String> = rest.split('/').map(decode_segment).collect();
        if parts.len() < 2 {
            return None;
        }
        Some(Self {
            kind: parts[0].clone(),
            slug: parts[1].clone(),
            variation: parts.get(2).filter(|v| !v.is_empty()).cloned(),
        })
    }
}

/// Percent-decode one path segment, as `query_pairs` does for query values.
fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Resolve a request target against a dummy origin.
pub(crate) fn parse_target(target: &str) -> Option<Url> {
    let base = Url::parse("http://localhost/").ok()?;
    base.join(target).ok()
}

/// An HTTP response body with its status and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            headers: Vec::new(),
            body,
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            headers: Vec::new(),
            body: value.to_string(),
        }
    }

    /// `303 See Other` to `location`.
    pub fn redirect(location: &str) -> Self {
        Self {
            status: 303,
            content_type: "text/plain; charset=utf-8",
            headers: vec![("Location".to_string(), location.to_string())],
            body: String::new(),
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal error document carrying the title, message and status.
pub fn error_page(status: u16, title: &str, message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body class=\"wp-vrt-error\" data-status=\"{status}\">\n<h1>{title}</h1>\n<p>{message}</p>\n</body>\n</html>",
        title = escape_html(title),
        message = escape_html(message),
    );
    Response::html(status, body)
}

/// Error page for a failed preview request.
pub fn error_response(err: &Error) -> Response {
    let message = match err {
        Error::Validation(message) => message.clone(),
        Error::NotFound(_) => "VRT item not found".to_string(),
        other => other.to_string(),
    };
    error_page(err.status(), err.title(), &message)
}

pub struct Router<'a> {
    vrt: &'a Vrt,
}

impl<'a> Router<'a> {
    pub fn new(vrt: &'a Vrt) -> Self {
        Self { vrt }
    }

    /// Answer `target` if it is a preview request.
    pub fn respond(&self, ctx: &mut RenderContext, target: &str) -> Option<Response> {
        let request = RouteRequest::parse(target, &self.vrt.config.prefix)?;
        Some(match self.handle(ctx, &request) {
            Ok(html) => Response::html(200, html),
            Err(e) => {
                debug!("preview {}/{} failed: {e}", request.kind, request.slug);
                error_response(&e)
            }
        })
    }

    /// Render the requested unit to a full HTML document.
    pub fn handle(&self, ctx: &mut RenderContext, request: &RouteRequest) -> Result<String> {
        let kind: UnitKind = request.kind.parse()?;
        let slug = request.slug.as_str();
        if slug.is_empty() {
            return Err(Error::NotFound(format!("{kind} with empty slug")));
        }
        let variation = request.variation.as_deref();

        let registries = self.vrt.registries();
        let content = registries.get(kind).get_content(slug, variation)?;
        debug!("content for {kind}/{slug}: {} bytes", content.len());
        if content.len() < 500 {
            debug!("content: {content:?}");
        }

        Renderer::new(self.vrt).render(ctx, kind, slug, variation, &content)
    }
}
