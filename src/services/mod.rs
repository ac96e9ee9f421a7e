pub mod block_editor;
pub mod page_loader;
pub mod render_assembler;
pub mod translation_service;

pub use block_editor::{BlockEditor, BlockUpdate};
pub use page_loader::{PageLoader, RenderedPage, RouteTable};
pub use render_assembler::RenderAssembler;
pub use translation_service::TranslationService;
