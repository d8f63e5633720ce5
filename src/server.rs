//! HTTP front end.
//!
//! `POST /print` prints the request body as markdown. With a non-empty
//! `preview` query parameter the document is rendered to a PNG preview and
//! returned instead. Every other path serves the editor page from the assets
//! directory.

use log::{error, info, warn};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::{
    device::Device,
    error::{Error, Result},
    preview::Preview,
    printer::Printer,
    renderer::Renderer,
};

/// Response to one request, before it is written to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Reply {
    fn status(status: u16) -> Self {
        Reply {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Reply {
            status: 200,
            content_type: Some(content_type),
            body,
        }
    }
}

/// Serves print and preview requests, one at a time, for a single printer.
pub struct PrintServer<W: Write> {
    renderer: Renderer,
    printer: Printer<W>,
    assets: PathBuf,
}

impl<W: Write> PrintServer<W> {
    /// `assets` holds `index.html`, `index.css` and `index.js`.
    pub fn new(renderer: Renderer, printer: Printer<W>, assets: impl Into<PathBuf>) -> Self {
        PrintServer {
            renderer,
            printer,
            assets: assets.into(),
        }
    }

    /// Listen on `address` and answer requests until the listener fails.
    pub fn serve(mut self, address: &str) -> Result<()> {
        let server = Server::http(address).map_err(|e| Error::Serve(e.to_string()))?;
        info!("listening on http://{}", server.server_addr());
        for request in server.incoming_requests() {
            self.respond(request);
        }
        Ok(())
    }

    fn respond(&mut self, mut request: Request) {
        let mut body = Vec::new();
        let reply = match request.as_reader().read_to_end(&mut body) {
            Ok(_) => self.handle(request.method(), request.url(), &body),
            Err(e) => {
                error!("error reading request body: {}", e);
                Reply::status(500)
            }
        };

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Some(content_type) = reply.content_type {
            if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
                response.add_header(header);
            }
        }
        if let Err(e) = request.respond(response) {
            warn!("error writing response: {}", e);
        }
    }

    /// Route one request.
    pub fn handle(&mut self, method: &Method, url: &str, body: &[u8]) -> Reply {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url, ""),
        };
        match path {
            "/print" if *method != Method::Post => Reply::status(405),
            "/print" => {
                let preview = url::form_urlencoded::parse(query.as_bytes())
                    .any(|(key, value)| key == "preview" && !value.is_empty());
                let markdown = String::from_utf8_lossy(body);
                match self.print(&markdown, preview) {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!("error rendering content: {}", e);
                        Reply::status(500)
                    }
                }
            }
            "/index.css" => self.asset("index.css", "text/css"),
            "/index.js" => self.asset("index.js", "application/javascript"),
            _ => self.asset("index.html", "text/html; charset=utf-8"),
        }
    }

    fn print(&mut self, markdown: &str, preview: bool) -> Result<Reply> {
        if !preview {
            self.renderer.render_markdown(&mut self.printer, markdown)?;
            return Ok(Reply::status(200));
        }
        let mut preview = Preview::new(self.printer.max_width(), self.printer.dpi());
        self.renderer.render_markdown(&mut preview, markdown)?;
        Ok(Reply::ok("image/png", preview.to_png()?))
    }

    fn asset(&self, name: &str, content_type: &'static str) -> Reply {
        let path = self.assets.join(name);
        match fs::read(&path) {
            Ok(data) => Reply::ok(content_type, data),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                Reply::status(404)
            }
        }
    }
}
