pub mod filter;
pub mod lead;
pub mod location;
