pub mod page_blocks;
pub mod pages;
pub mod translations;

pub use page_blocks::{BlockType, Entity as PageBlocks};
pub use pages::{Entity as Pages, PageStatus};
pub use translations::Entity as Translations;
