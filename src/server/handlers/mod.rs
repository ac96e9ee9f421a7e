pub mod health;
pub mod page_blocks;
pub mod pages;
