//! The eight named chunking algorithms (§4.3).

pub mod auto;
pub mod fixed_size;
pub mod hierarchical;
pub mod intelligent;
pub mod page_level;
pub mod paragraph;
pub mod semantic;
pub mod smart;

pub use auto::AutoStrategy;
pub use fixed_size::FixedSizeStrategy;
pub use hierarchical::HierarchicalStrategy;
pub use intelligent::IntelligentStrategy;
pub use page_level::PageLevelStrategy;
pub use paragraph::ParagraphStrategy;
pub use semantic::SemanticStrategy;
pub use smart::SmartStrategy;
