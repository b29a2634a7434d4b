//! File-driven HTTP mock server.
//!
//! Every `.json` file in the watched folder describes one mock: a url
//! pattern, a method, a status code, optional headers and a response that is
//! a json object, a json array, the name of a file to serve, or nothing.
//! The folder is polled and the route table follows additions, edits and
//! deletions without restarting the server.
//!
//! ```json
//! {
//!   "url": "/users/[0-9]+",
//!   "http_method": "GET",
//!   "http_code": 200,
//!   "headers": { "X-Mock": "true" },
//!   "response": { "id": 1, "name": "mock" }
//! }
//! ```

pub mod config;
pub mod filewatcher;
pub mod http;
pub mod mock;
