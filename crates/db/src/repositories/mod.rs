pub mod page_repo;

pub use page_repo::PageRepo;
