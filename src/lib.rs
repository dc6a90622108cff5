pub mod conditional;
pub mod config;
pub mod exception;
pub mod ignore;
pub mod mirror;
pub mod param;
pub mod request;
pub mod response;
pub mod serve;
pub mod util;
pub mod watch;

pub use conditional::{Disposition, RequestValidators};
pub use exception::Exception;
pub use ignore::IgnoreFilter;
pub use mirror::{DirectoryMirror, MirrorEntry};
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use serve::{ServeMirror, ServeOptions};
pub use util::HtmlBuilder;
pub use watch::MirrorWatcher;
