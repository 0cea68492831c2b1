//! Blocking HTTP front-end.
//!
//! One thread accepts and answers requests in order. The server owns the
//! single [`RenderContext`], so a request holds the ambient rendering state
//! from parse to response and no two renders ever share it.

use std::io::Read;
use std::net::SocketAddr;

use log::{debug, info, warn};
use tiny_http::{Header, Server};

use crate::admin::{self, AdminRequest};
use crate::discovery::{self, DISCOVERY_PATH};
use crate::dynamic::RenderContext;
use crate::editor_filter;
use crate::router::{error_page, parse_target, Response, Router};
use crate::{Error, Result, Vrt};

/// Answer one request. `target` is the raw request target (path and query).
pub fn dispatch(vrt: &Vrt, ctx: &mut RenderContext, request: &AdminRequest) -> Response {
    if let Some(response) = admin::respond(vrt, request) {
        return response;
    }

    let target = request.target.as_str();
    let path = parse_target(target)
        .map(|url| url.path().trim_end_matches('/').to_string())
        .unwrap_or_default();
    if path == DISCOVERY_PATH {
        return discovery::respond(vrt, target);
    }
    if let Some(response) = editor_filter::respond(vrt, target) {
        return response;
    }
    if let Some(response) = Router::new(vrt).respond(ctx, target) {
        return response;
    }
    error_page(404, "Not Found", "Nothing is served at this address.")
}

pub struct VrtServer {
    server: Server,
    vrt: Vrt,
    ctx: RenderContext,
}

impl VrtServer {
    /// Bind to `addr` (`host:port`; port `0` picks a free one). An empty
    /// home URL becomes the bound address.
    pub fn bind(mut vrt: Vrt, addr: &str) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| Error::Config(format!("cannot listen on {addr}: {e}")))?;
        if vrt.config.home_url.is_empty() {
            if let Some(bound) = server.server_addr().to_ip() {
                vrt.config.home_url = format!("http://{bound}");
            }
        }
        Ok(Self {
            server,
            vrt,
            ctx: RenderContext::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the listener fails.
    pub fn run(mut self) {
        if let Some(addr) = self.local_addr() {
            info!("serving previews on http://{addr}/{}/", self.vrt.config.prefix);
        }
        while let Ok(request) = self.server.recv() {
            self.handle(request);
        }
    }

    fn handle(&mut self, mut request: tiny_http::Request) {
        let mut body = String::new();
        if let Err(e) = request.as_reader().read_to_string(&mut body) {
            warn!("failed to read request body: {e}");
        }
        let admin_request = AdminRequest {
            method: request.method().to_string(),
            target: request.url().to_string(),
            headers: request
                .headers()
                .iter()
                .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
                .collect(),
            body,
        };

        let response = dispatch(&self.vrt, &mut self.ctx, &admin_request);
        debug!("{} {} -> {}", admin_request.method, admin_request.target, response.status);

        let mut reply = tiny_http::Response::from_string(response.body).with_status_code(response.status);
        let headers = std::iter::once(("Content-Type".to_string(), response.content_type.to_string())).chain(response.headers);
        for (name, value) in headers {
            match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                Ok(header) => reply.add_header(header),
                Err(()) => warn!("dropping invalid header {name}"),
            }
        }
        if let Err(e) = request.respond(reply) {
            warn!("failed to send response: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SiteFixture;
    use crate::test_support::vrt_with;

    fn get(vrt: &Vrt, target: &str) -> Response {
        dispatch(vrt, &mut RenderContext::new(), &AdminRequest::new("GET", target))
    }

    #[test]
    fn routes_to_every_surface() {
        let vrt = vrt_with(SiteFixture::default());
        assert_eq!(get(&vrt, "/wp-json/wp-vrt/v1/discover").content_type, "application/json; charset=utf-8");
        assert_eq!(get(&vrt, "/wp-json/wp/v2/block-patterns/patterns?context=edit").status, 200);
        assert_eq!(get(&vrt, "/wp-vrt/block/core-paragraph").status, 200);
        assert_eq!(get(&vrt, "/wp-vrt-admin/catalog").status, 403);
        assert_eq!(get(&vrt, "/favicon.ico").status, 404);
    }
}
