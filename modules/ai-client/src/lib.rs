pub mod claude;
pub mod error;
pub mod openai;
pub mod schema;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::{AiError, Result};
pub use openai::OpenAi;
pub use schema::{parse_structured, validate, SchemaDescriptor, StructuredOutput};
pub use traits::{generate, StructuredGenerator};
pub use util::{extract_json_object, strip_code_blocks};
