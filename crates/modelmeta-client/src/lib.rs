//! modelmeta Client - HTTP transport for management operations
//!
//! [`HttpDispatcher`] posts operations as JSON to `<endpoint>/management`
//! and maps the response `outcome` onto [`DispatchError`](modelmeta_common::DispatchError).

pub mod http;

pub use http::HttpDispatcher;
