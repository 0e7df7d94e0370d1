//! Inbound boundary: catalog files, request validation and the route map.

pub mod csv;
pub mod dispatch;
pub mod requests;
