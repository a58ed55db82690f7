//! Local stand-in for the visit API used by the integration tests
//!
//! Serves queued replies in order (repeating the last one) and records the
//! method, URL and headers of every request it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hjemis::Endpoints;
use tiny_http::{Header, Request, Response, Server};

#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct MockApi {
    pub addr: SocketAddr,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockApi {
    pub fn start(replies: Vec<Reply>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("start mock api"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("mock api listens on an IP address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(replies)));

        let listener = server.clone();
        let seen = requests.clone();
        thread::spawn(move || {
            for request in listener.incoming_requests() {
                seen.lock().unwrap().push(describe(&request));
                let reply = {
                    let mut queue = queue.lock().unwrap();
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                }
                .unwrap_or_else(|| Reply::ok("[]"));
                thread::spawn(move || respond(request, reply));
            }
        });

        Self {
            addr,
            server,
            requests,
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            denmark: format!("http://{}/dk.json", self.addr),
            norway: format!("http://{}/no.json", self.addr),
        }
    }

    /// Recorded requests, each as `METHOD url` followed by one `name: value` line per header
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn describe(request: &Request) -> String {
    let mut head = format!("{} {}\r\n", request.method(), request.url());
    for header in request.headers() {
        head.push_str(&format!("{}: {}\r\n", header.field, header.value));
    }
    head
}

fn respond(request: Request, reply: Reply) {
    if !reply.delay.is_zero() {
        thread::sleep(reply.delay);
    }
    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("valid header");
    let response = Response::from_string(reply.body)
        .with_status_code(reply.status)
        .with_header(content_type);
    let _ = request.respond(response);
}

/// Address with nothing listening on it
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}
