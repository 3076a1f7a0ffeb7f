/// MySQL binlog sync 실행 예제
///
/// 디코더 대신 표준 입력으로 JSON 형식의 `RawEvent`를 한 줄씩 받아 처리하고,
/// 핸들러로 전달된 이벤트를 JSON으로 출력합니다.
use async_trait::async_trait;
use binlog_sync::{
    catch_master_pos, BinlogSyncer, ChannelSource, ConnectionConfig, Dispatcher, FileStore,
    HandlerError, MySqlConnection, PositionTracker, QueryEvent, QueryHandler, RawEvent,
    RowsEvent, RowsHandler, SyncConfig, TableCache,
};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 이벤트를 JSON 한 줄로 출력하는 핸들러
struct JsonPrinter;

#[async_trait]
impl RowsHandler for JsonPrinter {
    fn name(&self) -> &str {
        "json_printer"
    }

    async fn on_rows(&self, event: &RowsEvent) -> Result<(), HandlerError> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

#[async_trait]
impl QueryHandler for JsonPrinter {
    fn name(&self) -> &str {
        "json_printer"
    }

    async fn on_query(&self, event: &QueryEvent) -> Result<(), HandlerError> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

/// 표준 입력의 JSON 이벤트를 채널로 전달
async fn read_events(tx: mpsc::UnboundedSender<RawEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<RawEvent>(&line) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping malformed event: {}", e),
            },
            Ok(None) => {
                info!("Event input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read event input: {}", e);
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 초기화
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 연결 설정
    let connection = ConnectionConfig {
        hostname: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("DB_PORT")
            .unwrap_or_else(|_| "3306".to_string())
            .parse()
            .unwrap_or(3306),
        username: env::var("DB_USER").unwrap_or_else(|_| "root".to_string()),
        password: env::var("DB_PASSWORD").unwrap_or_default(),
        database: env::var("DB_NAME").ok(),
        ..ConnectionConfig::default()
    };
    let config = match env::var("SYNC_CONFIG") {
        Ok(path) => SyncConfig::from_json_file(path)?,
        Err(_) => SyncConfig::default(),
    };
    let checkpoint_path =
        env::var("CHECKPOINT_PATH").unwrap_or_else(|_| "binlog_sync.checkpoint.json".to_string());

    info!(
        "Connecting to {}:{}",
        connection.hostname, connection.port
    );
    let conn = MySqlConnection::connect(connection).await?;

    // 체크포인트가 없으면 마스터의 현재 위치에서 시작
    let master = conn.get_binlog_status().await?;
    let store = Arc::new(FileStore::new(checkpoint_path));
    let tracker = PositionTracker::load(store, master, config.save_interval()).await?;

    let printer = Arc::new(JsonPrinter);
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_rows_handler(printer.clone());
    dispatcher.add_query_handler(printer);

    let (tx, source) = ChannelSource::channel();
    tokio::spawn(read_events(tx));

    let tables = Arc::new(TableCache::new(conn.clone()));
    let server_id = conn.get_server_id().await?;
    let mut syncer =
        BinlogSyncer::new(config, source, tables, dispatcher, tracker)?.with_server_id(server_id);

    let handle = syncer.position_handle();
    tokio::spawn(async move {
        match catch_master_pos(&conn, &handle, 0).await {
            Ok(()) => info!("Caught up with master at {}", handle.current()),
            Err(e) => warn!("Catch up failed: {}", e),
        }
    });

    syncer.start().await?;
    Ok(())
}
