//! Service layer exposing CRUD-style access to a wide-column store.
//! - One authenticated session per call, released on every exit path.
//! - Conversions between the store's native byte trees and wire DTOs.
//! - Table and row operations with a closed error taxonomy.

pub mod connection;
pub mod convert;
pub mod errors;
pub mod gateway;
pub mod pagination;
pub mod store;
