//! HTTP replies.

use anyhow::{Result, anyhow};
use serde::Serialize;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::html::escape_attr;
use crate::utils::mime::types;

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: types::HTML,
            body: body.into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: types::PLAIN,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn json(value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status: 200,
                content_type: types::JSON,
                body,
            },
            Err(e) => Self::error(&e.into()),
        }
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    /// 500 page carrying the whole error chain.
    pub fn error(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let body = format!(
            "<!DOCTYPE html><html><head><title>Report error</title></head>\
             <body><h1>Report error</h1><pre>{}</pre></body></html>",
            escape_attr(&message)
        );
        Self {
            status: 500,
            content_type: types::HTML,
            body: body.into_bytes(),
        }
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

/// Write the reply to the client.
pub fn send(request: Request, reply: Reply) -> Result<()> {
    let content_type = Header::from_bytes("Content-Type", reply.content_type)
        .map_err(|()| anyhow!("invalid content type `{}`", reply.content_type))?;
    let response = Response::from_data(reply.body)
        .with_status_code(StatusCode(reply.status))
        .with_header(content_type);
    request.respond(response)?;
    Ok(())
}
