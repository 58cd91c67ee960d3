//! Odoo client facade -- authenticate, query and create records.
//!
//! Each operation builds one request document and hands it to the failover
//! controller. There is no retry beyond the relay sweep, and no whole-call
//! cancellation: dropping the returned future abandons the call, though a
//! request already received by the server may still take effect.

use std::fmt;
use std::sync::Arc;

use odoo_rpc_protocol::{build_request, Struct, Value};

use crate::config::ClientConfig;
use crate::error::RpcError;
use crate::failover::{Failover, FailoverState};
use crate::relay::Relay;
use crate::transport::{Endpoint, HttpTransport, ReqwestTransport};

/// Odoo XML-RPC client bound to one server and database.
pub struct OdooClient {
    base_url: String,
    database: String,
    failover: Failover,
}

impl OdooClient {
    /// Client using reqwest for HTTP.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let failover = Failover::new(
            transport,
            config.relays.clone(),
            config.transport.use_proxy,
            config.timeout(),
            config.transport.page_origin.clone(),
        );
        Self {
            base_url: config.base_url().to_string(),
            database: config.server.database.clone(),
            failover,
        }
    }

    /// Share relay preference with other clients.
    pub fn with_failover_state(mut self, state: FailoverState) -> Self {
        self.failover = self.failover.with_state(state);
        self
    }

    pub fn failover_state(&self) -> &FailoverState {
        self.failover.state()
    }

    pub fn relays(&self) -> &[Relay] {
        self.failover.relays()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Invoke `method` on `endpoint` with positional `params`.
    pub async fn call(
        &self,
        endpoint: Endpoint,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let body = build_request(method, &params);
        tracing::debug!(%url, method, params = params.len(), "client: call");
        self.failover.call(&url, &body).await
    }

    /// Server version info. Needs no credentials.
    pub async fn version(&self) -> Result<Struct, RpcError> {
        match self.call(Endpoint::Common, "version", Vec::new()).await? {
            Value::Struct(info) => Ok(info),
            other => Err(unexpected("version", "struct", &other)),
        }
    }

    /// Resolve credentials to a user id. Odoo answers bad credentials with
    /// `false` rather than a fault; that becomes `AuthenticationFailed`.
    pub async fn authenticate(&self, username: &str, api_key: &str) -> Result<i64, RpcError> {
        let result = self
            .call(
                Endpoint::Common,
                "authenticate",
                vec![
                    self.database.as_str().into(),
                    username.into(),
                    api_key.into(),
                    Struct::new().into(),
                ],
            )
            .await?;

        match positive_id(&result) {
            Some(uid) => {
                tracing::info!(uid, username, "client: authenticated");
                Ok(uid)
            }
            None => {
                tracing::warn!(username, result = result.kind(), "client: authentication rejected");
                Err(RpcError::AuthenticationFailed)
            }
        }
    }

    /// Authenticate and look up the user's company.
    pub async fn login(&self, username: &str, api_key: &str) -> Result<Session, RpcError> {
        let uid = self.authenticate(username, api_key).await?;
        let mut session = Session {
            url: self.base_url.clone(),
            database: self.database.clone(),
            uid,
            api_key: api_key.to_string(),
            use_proxy: !self.failover.is_direct(),
            company_id: None,
            company_name: None,
        };

        match self.user_company(uid, api_key).await {
            Ok(Some((id, name))) => {
                session.company_id = Some(id);
                session.company_name = Some(name);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(uid, error = %e, "client: company lookup failed"),
        }
        Ok(session)
    }

    async fn user_company(&self, uid: i64, api_key: &str) -> Result<Option<(i64, String)>, RpcError> {
        let domain = Value::Array(vec![Value::Array(vec![
            "id".into(),
            "=".into(),
            uid.into(),
        ])]);
        let users = self
            .search_read(uid, api_key, "res.users", domain, &["company_id"], Struct::new())
            .await?;
        let company = users
            .first()
            .and_then(|user| user.get("company_id"))
            .and_then(Value::as_array)
            .and_then(|pair| match pair {
                [Value::Int(id), Value::Str(name), ..] => Some((*id, name.clone())),
                _ => None,
            });
        Ok(company)
    }

    /// `execute_kw(db, uid, key, model, method, args, kwargs)` on the object endpoint.
    pub async fn execute_kw(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Struct,
    ) -> Result<Value, RpcError> {
        self.object_call(uid, api_key, model, method, args, Some(kwargs))
            .await
    }

    /// `execute_kw` with the trailing kwargs struct omitted when `None`.
    async fn object_call(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Option<Struct>,
    ) -> Result<Value, RpcError> {
        let mut params = vec![
            self.database.as_str().into(),
            uid.into(),
            api_key.into(),
            model.into(),
            method.into(),
            Value::Array(args),
        ];
        if let Some(kwargs) = kwargs {
            params.push(kwargs.into());
        }
        self.call(Endpoint::Object, "execute_kw", params).await
    }

    /// Records of `model` matching `domain`. The domain is passed through
    /// untouched; `options` (limit, order, offset, context, ...) are merged
    /// after `fields` and win on conflict.
    pub async fn search_read(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        domain: Value,
        fields: &[&str],
        options: Struct,
    ) -> Result<Vec<Struct>, RpcError> {
        let mut kwargs = Struct::new().with(
            "fields",
            fields.iter().map(|f| Value::from(*f)).collect::<Vec<_>>(),
        );
        for (name, value) in options.iter() {
            kwargs.insert(name, value.clone());
        }

        let result = self
            .execute_kw(uid, api_key, model, "search_read", vec![domain], kwargs)
            .await?;
        let rows = match result {
            Value::Array(rows) => rows,
            other => return Err(unexpected("search_read", "array", &other)),
        };
        rows.into_iter()
            .map(|row| match row {
                Value::Struct(record) => Ok(record),
                other => Err(unexpected("search_read", "struct record", &other)),
            })
            .collect()
    }

    pub async fn search_count(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        domain: Value,
    ) -> Result<i64, RpcError> {
        let result = self
            .execute_kw(uid, api_key, model, "search_count", vec![domain], Struct::new())
            .await?;
        result
            .as_i64()
            .ok_or_else(|| unexpected("search_count", "int", &result))
    }

    /// Create one record; returns its id. Sent without a kwargs struct.
    pub async fn create(
        &self,
        uid: i64,
        api_key: &str,
        model: &str,
        values: Struct,
    ) -> Result<i64, RpcError> {
        let result = self
            .object_call(uid, api_key, model, "create", vec![values.into()], None)
            .await?;
        result
            .as_i64()
            .ok_or_else(|| unexpected("create", "int", &result))
    }
}

/// Ints above zero, or whole doubles above zero.
fn positive_id(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) if *i > 0 => Some(*i),
        Value::Double(d) if *d >= 1.0 && d.fract() == 0.0 && *d < i64::MAX as f64 => Some(*d as i64),
        _ => None,
    }
}

fn unexpected(method: &str, expected: &str, got: &Value) -> RpcError {
    RpcError::UnexpectedResult {
        method: method.to_string(),
        detail: format!("expected {expected}, got {}", got.kind()),
    }
}

/// Credentials held by the caller after login. Never persisted here.
#[derive(Clone)]
pub struct Session {
    pub url: String,
    pub database: String,
    pub uid: i64,
    pub api_key: String,
    pub use_proxy: bool,
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("uid", &self.uid)
            .field("api_key", &"<redacted>")
            .field("use_proxy", &self.use_proxy)
            .field("company_id", &self.company_id)
            .field("company_name", &self.company_name)
            .finish()
    }
}

impl Session {
    pub async fn search_read(
        &self,
        client: &OdooClient,
        model: &str,
        domain: Value,
        fields: &[&str],
        options: Struct,
    ) -> Result<Vec<Struct>, RpcError> {
        client
            .search_read(self.uid, &self.api_key, model, domain, fields, options)
            .await
    }

    pub async fn search_count(
        &self,
        client: &OdooClient,
        model: &str,
        domain: Value,
    ) -> Result<i64, RpcError> {
        client
            .search_count(self.uid, &self.api_key, model, domain)
            .await
    }

    pub async fn create(
        &self,
        client: &OdooClient,
        model: &str,
        values: Struct,
    ) -> Result<i64, RpcError> {
        client.create(self.uid, &self.api_key, model, values).await
    }
}
