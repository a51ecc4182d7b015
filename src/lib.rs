pub mod config;
pub mod exception;
pub mod handlers;
pub mod param;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod util;

pub use config::Config;
pub use exception::Exception;
pub use param::{HeaderMap, HeaderName, HttpStatus, Verb};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
pub use router::{Handler, Resolution, Router};
pub use server::{handle_connection, serve, ConnectionState, Server};
