//! Handler implementations

#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod http;
pub mod ring_buffer;

#[cfg(feature = "console")]
pub use console::{ConsoleHandler, ConsoleSeverity};
#[cfg(feature = "file")]
pub use file::FileHandler;
pub use http::{HttpHandler, HttpHandlerBuilder, HttpTransport, ReqwestTransport};
pub use ring_buffer::RingBufferHandler;

pub use crate::core::{Handler, HandlerOptions};
