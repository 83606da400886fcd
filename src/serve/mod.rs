//! Report server (`--serve`).
//!
//! | Route                  | Reply                                        |
//! |------------------------|----------------------------------------------|
//! | `GET /`                | plain-text banner                            |
//! | `GET /reports`         | JSON array of report directories             |
//! | `GET /reports/{id}`    | report HTML; query pairs become locals       |
//! | `POST /reports/{id}`   | request body rendered as the report's master |
//!
//! Requests are answered one at a time on a dedicated thread. The server
//! only produces HTML and never launches a browser.

mod reports;
mod response;
mod route;

pub use reports::{BANNER, ReportService, list_reports};
pub use response::Reply;
pub use route::Route;

use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use tiny_http::Server;
use tokio::runtime::Handle;

use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Largest request body read for `POST /reports/{id}`.
const MAX_BODY: u64 = 16 * 1024 * 1024;

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<Server> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok(server);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// A running server; [`stop`](Self::stop) ends it.
pub struct ReportServer {
    server: Arc<Server>,
    addr: SocketAddr,
    worker: JoinHandle<()>,
}

impl ReportServer {
    /// Bind and start answering requests. Must be called inside the runtime.
    pub fn start(interface: IpAddr, port: u16, service: Arc<ReportService>) -> Result<Self> {
        let runtime = Handle::try_current().context("the report server needs a tokio runtime")?;
        let server = Arc::new(bind_with_retry(interface, port)?);
        let addr = server
            .server_addr()
            .to_ip()
            .unwrap_or_else(|| SocketAddr::new(interface, port));

        let worker = {
            let server = Arc::clone(&server);
            thread::Builder::new()
                .name("quire-serve".into())
                .spawn(move || serve_requests(&server, &service, &runtime))
                .context("failed to start the report server thread")?
        };

        log!("serve"; "http://{}", addr);
        Ok(Self {
            server,
            addr,
            worker,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the one in flight.
    pub async fn stop(self) {
        self.server.unblock();
        let worker = self.worker;
        if !matches!(tokio::task::spawn_blocking(move || worker.join()).await, Ok(Ok(()))) {
            log!("serve"; "server thread did not shut down cleanly");
        }
    }
}

fn serve_requests(server: &Server, service: &ReportService, runtime: &Handle) {
    for mut request in server.incoming_requests() {
        let route = Route::parse(request.method(), request.url());
        debug!("serve"; "{} {}", request.method(), request.url());

        let mut body = String::new();
        if let Err(e) = request.as_reader().take(MAX_BODY).read_to_string(&mut body) {
            debug!("serve"; "unreadable request body: {}", e);
        }

        let reply = runtime.block_on(service.reply(route, body));
        if reply.status >= 500 {
            log!("error"; "{} {}: {}", request.method(), request.url(), reply.status);
        }
        if let Err(e) = response::send(request, reply) {
            debug!("serve"; "failed to send reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InlineConfig;
    use crate::plugin::AggregatedHooks;
    use crate::template::HandlebarsEngine;
    use std::fs;
    use std::io::Write;
    use std::net::{Ipv4Addr, TcpStream};
    use tempfile::TempDir;

    fn fetch(addr: SocketAddr, head: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "{head}\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_reports_over_http() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("cato")).unwrap();
        fs::write(dir.path().join("cato/cato.hbs"), "<p>{{param}}</p>").unwrap();

        let service = Arc::new(ReportService::new(
            dir.path().to_path_buf(),
            Arc::new(HandlebarsEngine::new()),
            Arc::new(AggregatedHooks::default()),
            InlineConfig::default(),
        ));
        let server = ReportServer::start(Ipv4Addr::LOCALHOST.into(), 0, service).unwrap();
        let addr = server.addr();

        let (listing, report, missing) = tokio::task::spawn_blocking(move || {
            (
                fetch(addr, "GET /reports HTTP/1.1"),
                fetch(addr, "GET /reports/cato?param=par HTTP/1.1"),
                fetch(addr, "GET /reports/nope HTTP/1.1"),
            )
        })
        .await
        .unwrap();

        assert!(listing.starts_with("HTTP/1.1 200"));
        assert!(listing.contains("application/json"));
        assert!(listing.ends_with(r#"["cato"]"#));
        assert!(report.starts_with("HTTP/1.1 200"));
        assert!(report.contains("<p>par</p>"));
        assert!(missing.starts_with("HTTP/1.1 404"));

        server.stop().await;
    }

    #[test]
    fn test_bind_retries_next_port() {
        let first = bind_with_retry(Ipv4Addr::LOCALHOST.into(), 0).unwrap();
        let taken = first.server_addr().to_ip().unwrap().port();
        let second = bind_with_retry(Ipv4Addr::LOCALHOST.into(), taken).unwrap();
        assert_ne!(second.server_addr().to_ip().unwrap().port(), taken);
    }
}
