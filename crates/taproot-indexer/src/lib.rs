//! Source tree discovery, symbol extraction and incremental graph building

pub mod builder;
pub mod config;
pub mod discovery;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod resolver;


pub use builder::Builder;
pub use config::BuildConfig;
pub use extractor::{ExtractionResult, LanguageExtractor};
pub use parser_pool::{FileType, ParseRequest, ParseResult, ParserPool};
pub use resolver::Resolution;
