pub mod lead_repo;
pub use lead_repo::{LeadRepository, LeadStore};
pub mod location_repo;
pub use location_repo::LocationRepository;
