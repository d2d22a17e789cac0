pub mod dates;
pub mod db_utils;
pub mod error;
#[cfg(test)]
pub mod test_fixtures;
