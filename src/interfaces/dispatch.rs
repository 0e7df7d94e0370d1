//! Route map from request paths to the application services.

use super::requests::{self, Query};
use crate::application::Services;
use crate::error::{Result, ServiceError};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl FromStr for Method {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(ServiceError::validation(format!("Unknown method: {other}"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        };
        f.write_str(name)
    }
}

/// A transport-neutral inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub token: Option<String>,
    pub query: Query,
    pub body: Value,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            token: None,
            query: Query::new(),
            body: Value::Null,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok(body: impl Serialize) -> Result<Self> {
        Ok(Self {
            status: 200,
            body: serde_json::to_value(body)?,
        })
    }

    fn empty() -> Self {
        Self {
            status: 200,
            body: json!({}),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "Error": message.into() }),
        }
    }

    fn method_not_allowed(method: Method) -> Self {
        Self::error(405, format!("Method {method} is not allowed here"))
    }
}

impl From<ServiceError> for Response {
    fn from(e: ServiceError) -> Self {
        match &e {
            ServiceError::ValidationError(message) => Self::error(400, message.clone()),
            ServiceError::Forbidden => {
                Self::error(403, "Missing required token, or token is invalid")
            }
            ServiceError::NotFound(_) => Self::error(404, e.to_string()),
            ServiceError::Exists(_) | ServiceError::Conflict(_) => Self::error(409, e.to_string()),
            ServiceError::GatewayError(_) | ServiceError::NotificationError(_) => {
                tracing::warn!(error = %e, "Upstream provider failed");
                Self::error(502, e.to_string())
            }
            ServiceError::IntegrityFault(_) | ServiceError::PartialFailure { .. } => {
                tracing::error!(error = %e, "Request left data inconsistent");
                Self::error(500, e.to_string())
            }
            _ => {
                tracing::error!(error = %e, "Request failed");
                Self::error(500, "Internal error")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Ping,
    Users,
    Tokens,
    Orders,
    Menu,
    Pay,
}

#[derive(Serialize)]
struct MenuEntry<'a> {
    id: u32,
    name: &'a str,
    price: String,
}

/// Maps request paths to handlers over one set of services.
///
/// Built once at startup; handlers run their store and service calls
/// sequentially and stop at the first failure.
pub struct Dispatcher {
    services: Services,
    routes: HashMap<&'static str, Route>,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        let routes = HashMap::from([
            ("ping", Route::Ping),
            ("users", Route::Users),
            ("tokens", Route::Tokens),
            ("orders", Route::Orders),
            ("menu", Route::Menu),
            ("pay", Route::Pay),
        ]);
        Self { services, routes }
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    pub async fn handle(&self, request: Request) -> Response {
        let path = request.path.trim().trim_matches('/');
        let Some(route) = self.routes.get(path).copied() else {
            return Response::error(404, format!("No handler for path {path:?}"));
        };
        tracing::debug!(method = %request.method, path, "Dispatching request");

        let result = match route {
            Route::Ping => Ok(Response::empty()),
            Route::Users => self.users(&request).await,
            Route::Tokens => self.tokens(&request).await,
            Route::Orders => self.orders(&request).await,
            Route::Menu => self.menu(&request).await,
            Route::Pay => self.pay(&request).await,
        };
        result.unwrap_or_else(Response::from)
    }

    async fn users(&self, request: &Request) -> Result<Response> {
        let accounts = &self.services.accounts;
        match request.method {
            Method::Post => {
                let new = requests::create_user(&request.body)?;
                Response::ok(accounts.create(new).await?)
            }
            Method::Get => {
                let email = requests::user_lookup(&request.query)?;
                let token = requests::token(request.token.as_deref())?;
                Response::ok(accounts.get(&token, &email).await?)
            }
            Method::Put => {
                let update = requests::update_user(&request.body)?;
                let token = requests::token(request.token.as_deref())?;
                Response::ok(accounts.update(&token, &update.email, update.changes).await?)
            }
            Method::Delete => {
                let email = requests::user_lookup(&request.query)?;
                let token = requests::token(request.token.as_deref())?;
                accounts.delete(&token, &email).await?;
                Ok(Response::empty())
            }
            other => Ok(Response::method_not_allowed(other)),
        }
    }

    async fn tokens(&self, request: &Request) -> Result<Response> {
        let tokens = &self.services.tokens;
        match request.method {
            Method::Post => {
                let credentials = requests::issue_token(&request.body)?;
                Response::ok(tokens.issue(&credentials.email, &credentials.password).await?)
            }
            Method::Get => {
                let id = requests::token_lookup(&request.query)?;
                Response::ok(tokens.get(&id).await?)
            }
            Method::Put => {
                let id = requests::extend_token(&request.body)?;
                Response::ok(tokens.extend(&id).await?)
            }
            Method::Delete => {
                let id = requests::token_lookup(&request.query)?;
                tokens.revoke(&id).await?;
                Ok(Response::empty())
            }
            other => Ok(Response::method_not_allowed(other)),
        }
    }

    async fn orders(&self, request: &Request) -> Result<Response> {
        let orders = &self.services.orders;
        match request.method {
            Method::Post => {
                let items = requests::create_order(&request.body)?;
                let token = requests::token(request.token.as_deref())?;
                Response::ok(orders.create(&token, items).await?)
            }
            Method::Get => {
                let id = requests::order_lookup(&request.query)?;
                let token = requests::token(request.token.as_deref())?;
                Response::ok(orders.read(&token, &id).await?)
            }
            Method::Put => {
                let update = requests::update_order(&request.body)?;
                let token = requests::token(request.token.as_deref())?;
                Response::ok(orders.update_items(&token, &update.id, update.items).await?)
            }
            Method::Delete => {
                let id = requests::order_lookup(&request.query)?;
                let token = requests::token(request.token.as_deref())?;
                orders.delete(&token, &id).await?;
                Ok(Response::empty())
            }
            other => Ok(Response::method_not_allowed(other)),
        }
    }

    async fn menu(&self, request: &Request) -> Result<Response> {
        if request.method != Method::Get {
            return Ok(Response::method_not_allowed(request.method));
        }
        let token = requests::token(request.token.as_deref())?;
        let catalog = self.services.orders.menu(&token).await?;
        let entries: Vec<MenuEntry<'_>> = catalog
            .items()
            .map(|item| MenuEntry {
                id: item.id.0,
                name: &item.name,
                price: format!("{:.2}", item.price),
            })
            .collect();
        Response::ok(entries)
    }

    async fn pay(&self, request: &Request) -> Result<Response> {
        if request.method != Method::Post {
            return Ok(Response::method_not_allowed(request.method));
        }
        let id = requests::pay(&request.body)?;
        let token = requests::token(request.token.as_deref())?;
        Response::ok(self.services.orders.submit(&token, &id).await?)
    }
}
