use meeting_cli::notifier::LogNotifier;
use meeting_cli::session::{EMPTY_LINE_MESSAGE, GOODBYE_MESSAGE, PROMPT};
use meeting_cli::{run_session, AgentConfig, AppContext};
use meeting_vector_store::HashingEmbedder;
use std::sync::Arc;
use tempfile::TempDir;

const SEED: &str = r#"[
  {"meeting_id":"M0001","title":"Standup","date":"2024-01-10","start_time":"09:00",
   "end_time":"09:15","location":"Room 4","attendees":["ana@x.com"],"status":"scheduled"}
]"#;

async fn run(temp: &TempDir, script: &str) -> String {
    let seed = temp.path().join("seed.json");
    std::fs::write(&seed, SEED).expect("write seed");
    let mut config = AgentConfig::with_data_dir(temp.path().join("data"));
    config.seed_file = Some(seed);
    let mut app = AppContext::bootstrap_with(
        config,
        Arc::new(HashingEmbedder::default()),
        Arc::new(LogNotifier),
    )
    .await
    .expect("bootstrap");

    let mut output = Vec::new();
    run_session(&mut app, script.as_bytes(), &mut output)
        .await
        .expect("session");
    String::from_utf8(output).expect("utf8 output")
}

#[tokio::test]
async fn exit_token_ends_the_loop() {
    let temp = TempDir::new().expect("tempdir");
    let out = run(&temp, "\n  \nstandup\ncancel M0001\nEXIT\nstandup\n").await;

    assert!(out.starts_with("Meeting Agent Chat Interface"), "{out}");
    assert_eq!(out.matches(EMPTY_LINE_MESSAGE).count(), 2, "{out}");
    assert_eq!(out.matches("Agent: ").count(), 2, "{out}");
    assert!(out.contains("Agent: Meeting M0001 has been cancelled."), "{out}");
    assert!(out.trim_end().ends_with(GOODBYE_MESSAGE), "{out}");
}

#[tokio::test]
async fn end_of_input_says_goodbye() {
    let temp = TempDir::new().expect("tempdir");
    let out = run(&temp, "standup\n").await;

    assert_eq!(out.matches(PROMPT).count(), 2, "{out}");
    assert!(out.contains("Meeting ID: M0001"), "{out}");
    assert!(out.trim_end().ends_with(GOODBYE_MESSAGE), "{out}");
}

#[tokio::test]
async fn a_failing_line_does_not_end_the_session() {
    let temp = TempDir::new().expect("tempdir");
    let out = run(&temp, "{\"action\":\"dance\"}\nstandup\nbye\n").await;

    assert!(out.contains("An error occurred: Invalid command JSON"), "{out}");
    assert!(out.contains("Meeting ID: M0001"), "{out}");
    assert!(out.trim_end().ends_with(GOODBYE_MESSAGE), "{out}");
}
