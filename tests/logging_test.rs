mod common;

use common::{ harness, send, StubChat, StubRetriever, StubSpeech };
use log::{ Level, LevelFilter, Log, Metadata, Record };
use serde_json::json;
use std::sync::Mutex;

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target().starts_with("rag_voice_relay") {
            RECORDS.lock().unwrap().push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

#[tokio::test]
async fn user_text_stays_out_of_info_logs() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let h = harness(
        StubChat::replying("Noted."),
        StubSpeech::returning(b"a"),
        StubRetriever::returning("Late fee: $50")
    );
    let utterance = "my card number is 4111 1111 1111 1111";
    for uri in ["/api/text-chat", "/api/process-speech"] {
        let body = json!({ "message": utterance, "transcript": utterance });
        send(&h.app, "POST", uri, Some(body), None).await;
    }

    let records = RECORDS.lock().unwrap().clone();
    let info: Vec<&String> = records
        .iter()
        .filter(|(level, _)| *level <= Level::Info)
        .map(|(_, message)| message)
        .collect();
    assert!(info.iter().all(|m| !m.contains(utterance)), "{:?}", info);
    assert_eq!(info.len(), 2, "{:?}", info);
    assert!(info.iter().all(|m| m.contains("Turn in conversation")));

    // Content is still available at debug level.
    assert!(records.iter().any(|(level, m)| *level == Level::Debug && m.contains(utterance)));
}
