mod position;
mod stream;

pub use position::{SourcePosition, SourceSpan};
pub use stream::{CharStream, StreamResult};
