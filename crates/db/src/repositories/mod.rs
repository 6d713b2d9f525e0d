mod journal_entry_repo;
mod rate_limit_repo;

pub use journal_entry_repo::JournalEntryRepo;
pub use rate_limit_repo::RateLimitRepo;
