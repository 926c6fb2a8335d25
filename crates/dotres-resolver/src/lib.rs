//! dotres resolver: analysis sessions, symbol location and relationship graphs

pub mod alias;
pub mod locator;
pub mod projects;
pub mod relations;
pub mod session;

#[cfg(test)]
mod tests;

pub use locator::SymbolLocator;
pub use relations::{MEMBER_GROUP_ORDER, build_header_model};
pub use session::{AnalysisSession, LoadedProject};
