pub mod date_range;
pub mod lead_filter;
pub mod lead_service;
pub mod location_service;
pub mod spreadsheet;
