//! Parse-and-validate functions for inbound requests.
//!
//! Each function turns an untrusted JSON body or query map into a validated
//! request type, or fails with `ValidationError`. Nothing past this boundary
//! sees an unchecked payload.

use crate::application::accounts::{AccountChanges, NewAccount};
use crate::domain::account::Email;
use crate::domain::catalog::ItemId;
use crate::domain::id::{OrderId, TokenId};
use crate::error::{Result, ServiceError};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

pub type Query = BTreeMap<String, String>;

const MISSING_FIELDS: &str = "Missing required fields, or fields are invalid";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserPayload {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    street_address: Option<String>,
    password: Option<String>,
    tos_agreement: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenPayload {
    id: Option<String>,
    email: Option<String>,
    password: Option<String>,
    extend: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrderPayload {
    id: Option<String>,
    order: Option<Vec<u32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Lookup {
    id: Option<String>,
    email: Option<String>,
}

/// Email and password presented for a new token.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateUser {
    pub email: Email,
    pub changes: AccountChanges,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOrder {
    pub id: OrderId,
    pub items: Vec<ItemId>,
}

fn parse_body<T: DeserializeOwned + Default>(body: &Value) -> Result<T> {
    match body {
        Value::Null => Ok(T::default()),
        Value::Object(_) => {
            serde_json::from_value(body.clone()).map_err(|_| ServiceError::validation(MISSING_FIELDS))
        }
        _ => Err(ServiceError::validation("Request body must be a JSON object")),
    }
}

fn parse_query(query: &Query) -> Lookup {
    Lookup {
        id: query.get("id").cloned(),
        email: query.get("email").cloned(),
    }
}

/// Trimmed, non-empty text.
fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>) -> Result<String> {
    text(value).ok_or_else(|| ServiceError::validation(MISSING_FIELDS))
}

fn required_email(value: Option<String>) -> Result<Email> {
    Email::parse(&required_text(value)?)
}

fn required_id<T: TryFrom<String, Error = ServiceError>>(value: Option<String>) -> Result<T> {
    T::try_from(required_text(value)?)
}

fn required_items(value: Option<Vec<u32>>) -> Result<Vec<ItemId>> {
    match value {
        Some(items) if !items.is_empty() => Ok(items.into_iter().map(ItemId).collect()),
        _ => Err(ServiceError::validation(
            "Order must be a non-empty list of item ids",
        )),
    }
}

/// The token presented with the request; absent or malformed is `Forbidden`.
pub fn token(header: Option<&str>) -> Result<TokenId> {
    header
        .and_then(|raw| TokenId::try_from(raw).ok())
        .ok_or(ServiceError::Forbidden)
}

pub fn create_user(body: &Value) -> Result<NewAccount> {
    let payload: UserPayload = parse_body(body)?;
    if payload.tos_agreement != Some(true) {
        return Err(ServiceError::validation(
            "The terms of service must be agreed to",
        ));
    }
    Ok(NewAccount {
        email: required_email(payload.email)?,
        first_name: required_text(payload.first_name)?,
        last_name: required_text(payload.last_name)?,
        street_address: required_text(payload.street_address)?,
        password: required_text(payload.password)?,
    })
}

pub fn user_lookup(query: &Query) -> Result<Email> {
    required_email(parse_query(query).email)
}

pub fn update_user(body: &Value) -> Result<UpdateUser> {
    let payload: UserPayload = parse_body(body)?;
    let email = required_email(payload.email)?;
    let changes = AccountChanges {
        first_name: text(payload.first_name),
        last_name: text(payload.last_name),
        street_address: text(payload.street_address),
        password: text(payload.password),
    };
    if changes.is_empty() {
        return Err(ServiceError::validation("Missing fields to update"));
    }
    Ok(UpdateUser { email, changes })
}

pub fn issue_token(body: &Value) -> Result<Credentials> {
    let payload: TokenPayload = parse_body(body)?;
    Ok(Credentials {
        email: required_email(payload.email)?,
        password: required_text(payload.password)?,
    })
}

pub fn token_lookup(query: &Query) -> Result<TokenId> {
    required_id(parse_query(query).id)
}

/// Token id to extend; the body must carry `"extend": true`.
pub fn extend_token(body: &Value) -> Result<TokenId> {
    let payload: TokenPayload = parse_body(body)?;
    if payload.extend != Some(true) {
        return Err(ServiceError::validation(MISSING_FIELDS));
    }
    required_id(payload.id)
}

pub fn create_order(body: &Value) -> Result<Vec<ItemId>> {
    let payload: OrderPayload = parse_body(body)?;
    required_items(payload.order)
}

pub fn order_lookup(query: &Query) -> Result<OrderId> {
    required_id(parse_query(query).id)
}

pub fn update_order(body: &Value) -> Result<UpdateOrder> {
    let payload: OrderPayload = parse_body(body)?;
    Ok(UpdateOrder {
        id: required_id(payload.id)?,
        items: required_items(payload.order)?,
    })
}

pub fn pay(body: &Value) -> Result<OrderId> {
    let payload: OrderPayload = parse_body(body)?;
    required_id(payload.id)
}
