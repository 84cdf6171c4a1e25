mod sqlite;
pub mod tables;

pub use sqlite::Database;

#[cfg(test)]
pub use sqlite::test_support;
