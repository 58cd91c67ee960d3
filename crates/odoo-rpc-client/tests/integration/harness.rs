//! Test harness for in-process client integration tests.
//!
//! FakeOdoo speaks XML-RPC on the common/object endpoints with a small
//! in-memory record store. FakeRelay imitates a public CORS relay: it either
//! forwards `?url=` targets or misbehaves in one fixed way. Both bind
//! 127.0.0.1:0 and count the requests they receive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use odoo_rpc_client::{ClientConfig, Relay};
use odoo_rpc_protocol::{build_fault_response, build_success_response, MethodCall, Struct, Value};

pub const DATABASE: &str = "acme";
pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_KEY: &str = "test-api-key";
pub const ADMIN_UID: i64 = 2;

async fn serve(router: Router) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

// ============================================================================
// Fake Odoo server
// ============================================================================

struct OdooState {
    hits: AtomicUsize,
    next_id: AtomicI64,
    records: Mutex<HashMap<String, Vec<Struct>>>,
}

pub struct FakeOdoo {
    pub url: String,
    state: Arc<OdooState>,
}

#[allow(dead_code)]
impl FakeOdoo {
    pub async fn start() -> anyhow::Result<Self> {
        let mut records = HashMap::new();
        records.insert(
            "res.users".to_string(),
            vec![Struct::new()
                .with("id", ADMIN_UID)
                .with("name", "Administrator")
                .with("company_id", Value::Array(vec![1.into(), "Acme Retail".into()]))],
        );
        records.insert(
            "pos.config".to_string(),
            vec![
                Struct::new().with("id", 1).with("name", "Main Shop").with("active", true),
                Struct::new().with("id", 2).with("name", "Airport Kiosk").with("active", true),
                Struct::new().with("id", 3).with("name", "Old Outlet").with("active", false),
            ],
        );

        let state = Arc::new(OdooState {
            hits: AtomicUsize::new(0),
            next_id: AtomicI64::new(100),
            records: Mutex::new(records),
        });
        let router = Router::new()
            .route("/xmlrpc/2/common", post(common))
            .route("/xmlrpc/2/object", post(object))
            .with_state(state.clone());
        let addr = serve(router).await?;
        Ok(Self {
            url: format!("http://{addr}"),
            state,
        })
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn records(&self, model: &str) -> Vec<Struct> {
        self.state
            .records
            .lock()
            .unwrap()
            .get(model)
            .cloned()
            .unwrap_or_default()
    }
}

async fn common(State(state): State<Arc<OdooState>>, body: String) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let call = match MethodCall::parse(&body) {
        Ok(call) => call,
        Err(e) => return xml(build_fault_response(1, &e.to_string())),
    };
    let reply = match call.method_name.as_str() {
        "version" => build_success_response(
            &Struct::new()
                .with("server_version", "17.0")
                .with("protocol_version", 1)
                .into(),
        ),
        "authenticate" => {
            let ok = call.params.len() == 4
                && call.params[0] == Value::from(DATABASE)
                && call.params[1] == Value::from(ADMIN_LOGIN)
                && call.params[2] == Value::from(ADMIN_KEY);
            build_success_response(&if ok {
                Value::Int(ADMIN_UID)
            } else {
                Value::Bool(false)
            })
        }
        other => build_fault_response(1, &format!("Method not available: {other}")),
    };
    xml(reply)
}

async fn object(State(state): State<Arc<OdooState>>, body: String) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let call = match MethodCall::parse(&body) {
        // kwargs are optional, as on a real server
        Ok(call) if call.method_name == "execute_kw" && (6..=7).contains(&call.params.len()) => {
            call
        }
        Ok(call) => {
            return xml(build_fault_response(
                1,
                &format!("bad call {} with {} params", call.method_name, call.params.len()),
            ))
        }
        Err(e) => return xml(build_fault_response(1, &e.to_string())),
    };
    let p = &call.params;
    if p[1] != Value::Int(ADMIN_UID) || p[2] != Value::from(ADMIN_KEY) {
        return xml(build_fault_response(3, "Access Denied"));
    }
    let model = p[3].as_str().unwrap_or_default().to_string();
    let method = p[4].as_str().unwrap_or_default();
    let args = p[5].as_array().unwrap_or_default();
    let kwargs = p.get(6).and_then(Value::as_struct).cloned().unwrap_or_default();

    let mut store = state.records.lock().unwrap();
    let reply = match method {
        "search_read" => {
            let domain = args.first().cloned().unwrap_or(Value::Array(vec![]));
            let fields: Vec<String> = kwargs
                .get("fields")
                .and_then(Value::as_array)
                .unwrap_or_default()
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect();
            let limit = kwargs
                .get("limit")
                .and_then(Value::as_i64)
                .map_or(usize::MAX, |l| l as usize);
            let rows: Vec<Value> = store
                .get(&model)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .filter(|r| matches_domain(r, &domain))
                .take(limit)
                .map(|r| Value::Struct(project(r, &fields)))
                .collect();
            build_success_response(&Value::Array(rows))
        }
        "search_count" => {
            let domain = args.first().cloned().unwrap_or(Value::Array(vec![]));
            let count = store
                .get(&model)
                .map_or(0, |rows| rows.iter().filter(|r| matches_domain(r, &domain)).count());
            build_success_response(&Value::Int(count as i64))
        }
        "create" => match args.first().and_then(Value::as_struct) {
            Some(values) => {
                let id = state.next_id.fetch_add(1, Ordering::SeqCst);
                let mut record = values.clone();
                record.insert("id", id);
                store.entry(model).or_default().push(record);
                build_success_response(&Value::Int(id))
            }
            None => build_fault_response(2, "create expects a values dict"),
        },
        other => build_fault_response(2, &format!("The method '{other}' does not exist")),
    };
    xml(reply)
}

/// Supports `[field, "=", value]` and `[field, "in", [values]]` terms, ANDed.
fn matches_domain(record: &Struct, domain: &Value) -> bool {
    domain.as_array().unwrap_or_default().iter().all(|term| {
        match term.as_array() {
            Some([Value::Str(field), Value::Str(op), expected]) => {
                let actual = record.get(field).unwrap_or(&Value::Nil);
                match op.as_str() {
                    "=" => actual == expected,
                    "in" => expected.as_array().unwrap_or_default().contains(actual),
                    _ => false,
                }
            }
            _ => false,
        }
    })
}

fn project(record: &Struct, fields: &[String]) -> Struct {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = Struct::new().with("id", record.get("id").cloned().unwrap_or(Value::Nil));
    for field in fields {
        out.insert(field.as_str(), record.get(field).cloned().unwrap_or(Value::Bool(false)));
    }
    out
}

// ============================================================================
// Fake CORS relay
// ============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum RelayMode {
    /// Proxy the request to the `url` query parameter.
    Forward,
    /// 200 with an empty body.
    Empty,
    /// Bare status code.
    Status(u16),
    /// Never answer.
    Hang,
    /// 200 with a plain-text error page.
    ErrorPage,
}

struct RelayState {
    mode: RelayMode,
    hits: AtomicUsize,
    http: reqwest::Client,
}

pub struct FakeRelay {
    pub name: String,
    addr: String,
    state: Arc<RelayState>,
}

impl FakeRelay {
    pub async fn start(name: &str, mode: RelayMode) -> anyhow::Result<Self> {
        let state = Arc::new(RelayState {
            mode,
            hits: AtomicUsize::new(0),
            http: reqwest::Client::new(),
        });
        let router = Router::new()
            .route("/proxy", post(proxy))
            .with_state(state.clone());
        let addr = serve(router).await?;
        Ok(Self {
            name: name.to_string(),
            addr,
            state,
        })
    }

    pub fn relay(&self) -> Relay {
        Relay::new(&self.name, format!("http://{}/proxy?url={{url}}", self.addr))
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn proxy(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match state.mode {
        RelayMode::Forward => {
            let Some(target) = query.get("url") else {
                return (StatusCode::BAD_REQUEST, "missing url").into_response();
            };
            match state
                .http
                .post(target)
                .header("content-type", "text/xml")
                .body(body)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = StatusCode::from_u16(resp.status().as_u16())
                        .unwrap_or(StatusCode::BAD_GATEWAY);
                    let text = resp.text().await.unwrap_or_default();
                    (status, text).into_response()
                }
                Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
            }
        }
        RelayMode::Empty => (StatusCode::OK, String::new()).into_response(),
        RelayMode::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        RelayMode::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        RelayMode::ErrorPage => (
            StatusCode::OK,
            "Error: this origin is not allowed to use the proxy",
        )
            .into_response(),
    }
}

// ============================================================================
// Client wiring
// ============================================================================

/// Config pointing at `odoo` through `relays` in order, 1s attempt timeout.
pub fn config_for(odoo: &FakeOdoo, relays: &[&FakeRelay]) -> ClientConfig {
    let mut cfg = ClientConfig::new(&odoo.url, DATABASE);
    cfg.transport.timeout_secs = 1;
    cfg.transport.use_proxy = true;
    cfg.relays = relays.iter().map(|r| r.relay()).collect();
    cfg
}
