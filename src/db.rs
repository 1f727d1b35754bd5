//! Functions for initializing the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, entry::create_entry_table, user::create_user_table};

/// Create the tables for the application's domain models.
///
/// Safe to call on a database that has already been initialized, the tables
/// are only created if they do not exist.
///
/// # Errors
///
/// This function will return an error if any of the SQL queries failed.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_entry_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    fn table_names(connection: &Connection) -> Vec<String> {
        connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|name| name.unwrap())
            .collect()
    }

    #[test]
    fn initialize_creates_user_and_entry_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let names = table_names(&connection);
        assert!(names.contains(&"user".to_owned()), "got tables {names:?}");
        assert!(names.contains(&"entry".to_owned()), "got tables {names:?}");
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).expect("initializing twice should not fail");
    }
}
