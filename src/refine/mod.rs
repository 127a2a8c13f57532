//! Refine stage (C2): noise cleanup, table/list/image normalization,
//! heading and section detection, optional LLM structural enhancement.

mod cleaner;
mod headings;
mod images;
mod lists;
mod refiner;
mod sections;
mod tables;
pub mod types;

pub use refiner::refine;
pub use types::{
    DocumentMetadata, Location, RefinedContent, RefinementInfo, RefinementQuality, Section, SectionType,
    StructuredElement,
};
