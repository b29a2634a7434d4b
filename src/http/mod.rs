pub mod dispatch;
pub mod handler;
pub mod method;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
