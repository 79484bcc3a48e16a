pub mod analyze_document;
pub mod edit_text;
pub mod executor;
pub mod image_prompt;
pub mod params;
pub mod registry;
pub mod rewrite_document;
pub mod schema;

pub use analyze_document::{infer_focus_area, AnalyzeDocumentTool};
pub use edit_text::EditTextTool;
pub use executor::{ToolExecutor, ToolFailure};
pub use image_prompt::ImagePromptTool;
pub use registry::{Tool, ToolCatalog, ToolContext, ToolKind};
pub use rewrite_document::RewriteDocumentTool;
pub use schema::plan_schema_json;
