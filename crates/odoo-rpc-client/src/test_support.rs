//! Scripted in-memory transport for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::transport::{HttpReply, HttpTransport, PostError, PostFuture};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Status(u16),
    Network(String),
    Hang,
}

/// Answers each POST by the first route whose prefix matches the URL and
/// records every URL it was asked for.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url_prefix: &str, reply: Reply) -> Self {
        self.routes.push((url_prefix.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn post_xml<'a>(&'a self, url: &'a str, body: String) -> PostFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(url.to_string());
            self.bodies.lock().unwrap().push(body);
            let reply = self
                .routes
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                .map(|(_, reply)| reply.clone());
            match reply {
                Some(Reply::Ok(body)) => Ok(HttpReply { status: 200, body }),
                Some(Reply::Status(status)) => Ok(HttpReply {
                    status,
                    body: String::new(),
                }),
                Some(Reply::Network(message)) => Err(PostError::Network(message)),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(PostError::Timeout)
                }
                None => Err(PostError::Network(format!("no route to {url}"))),
            }
        })
    }
}
