use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, register_int_counter_vec,
    CounterVec, Encoder, Gauge, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static::lazy_static! {
    pub static ref COLLECTOR_TICKS: IntCounter = register_int_counter!(
        "collector_ticks_total",
        "Number of completed collection ticks"
    ).unwrap();

    pub static ref LAST_TICK_SECONDS: Gauge = register_gauge!(
        "collector_last_tick_seconds",
        "Duration of the most recent collection tick"
    ).unwrap();

    pub static ref ROWS_INSERTED: IntCounterVec = register_int_counter_vec!(
        "rows_inserted_total",
        "Rows appended per table",
        &["table"]
    ).unwrap();

    pub static ref INSERTS_FAILED: IntCounterVec = register_int_counter_vec!(
        "inserts_failed_total",
        "Failed inserts per table",
        &["table"]
    ).unwrap();

    pub static ref STATUS_LINES_SKIPPED: IntCounter = register_int_counter!(
        "pool_status_lines_skipped_total",
        "pool.status lines that could not be parsed"
    ).unwrap();

    pub static ref USER_FILES_SKIPPED: IntCounter = register_int_counter!(
        "user_files_skipped_total",
        "User files that could not be read or parsed"
    ).unwrap();

    pub static ref DB_QUERIES_SUCCESS: CounterVec = register_counter_vec!(
        "db_queries_success",
        "Number of successful database queries",
        &["query_type"]
    ).unwrap();

    pub static ref DB_QUERIES_FAILED: CounterVec = register_counter_vec!(
        "db_queries_failed",
        "Number of failed database queries",
        &["query_type"]
    ).unwrap();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
