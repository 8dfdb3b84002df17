//! A compiled-code-model Mustache-family template engine.
//!
//! Templates compile down to a flat array of [`code::Code`] opcodes. Two
//! symmetric interpreters walk that array: `execute` renders it against a
//! [`scope::Scope`] to text, and `unexecute` runs the process in reverse,
//! recovering a `Scope` from rendered text. A third, data-free walk
//! (`identity`) reproduces the template's own source form, used for
//! introspection.
//!
//! [`template::Template`] ties the pieces together: it owns a compiled code
//! array and implements [`handle::TemplateHandle`], the callback surface the
//! opcodes use for value lookup, iteration, and partial resolution.
//! [`registry::Registry`] resolves `{{>name}}`/`{{<name}}` references
//! between templates at construction time.

pub mod code;
pub mod compile;
pub mod encode;
pub mod error;
pub mod handle;
pub mod parse;
pub mod path;
pub mod registry;
pub mod scope;
pub mod span;
pub mod template;
pub mod writer;

pub use code::Code;
pub use error::{Line, ParseError, RenderError};
pub use handle::TemplateHandle;
pub use path::Path;
pub use registry::Registry;
pub use scope::{Scope, Value};
pub use template::Template;
