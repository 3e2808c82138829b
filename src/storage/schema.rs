use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct DatabaseSchema;

impl DatabaseSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        conn.execute(
            "CREATE SEQUENCE IF NOT EXISTS accelerometer_data_seq",
            [],
        )?;

        // recorded_at 是落盘时刻的统一时间戳，不是采集时间
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accelerometer_data (
                id INTEGER PRIMARY KEY DEFAULT nextval('accelerometer_data_seq'),
                x DOUBLE,
                y DOUBLE,
                z DOUBLE,
                recorded_at BIGINT,
                session_id VARCHAR
            )",
            [],
        )?;

        conn.execute(
            "CREATE SEQUENCE IF NOT EXISTS session_features_seq",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_features (
                id INTEGER PRIMARY KEY DEFAULT nextval('session_features_seq'),
                session_id VARCHAR,
                axis VARCHAR,
                sample_count INTEGER,
                mean DOUBLE,
                std_dev DOUBLE,
                min_value DOUBLE,
                max_value DOUBLE,
                recorded_at BIGINT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        info!("Database tables created successfully");
        Ok(())
    }
}
