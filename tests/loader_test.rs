// Tests for ForecastLoader against local files and a mocked HTTP server
// Uses mockito for HTTP mocking and tempfile for file fixtures

use mockito::{Matcher, Server};
use std::io::Write;
use wind_blender::load_error::LoadError;
use wind_blender::loader::ForecastLoader;

const SNAPSHOT: &str = r#"{
    "meta": {"models": ["gfs", "icon"], "generated_at": "2025-10-18T06:00:00Z"},
    "hours": [
        {"time": "2025-10-18T09:00:00Z", "gfs": {"wind": 12.0, "gust": 18.0, "dir": 240}, "icon": {"wind": 14.0, "gust": 20.0, "dir": 250}},
        {"time": "2025-10-18T10:00:00Z", "gfs": {"wind": 13.0, "gust": 19.0, "dir": 245}}
    ]
}"#;

fn snapshot_path() -> Matcher {
    Matcher::Regex(r"^/data/latest\.json".to_string())
}

#[tokio::test]
async fn test_load_remote_success() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", snapshot_path())
        .match_query(Matcher::Regex(r"ts=\d+".to_string()))
        .match_header("cache-control", "no-cache")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SNAPSHOT)
        .create_async()
        .await;

    let loader = ForecastLoader::new().unwrap();
    let forecast = loader
        .load(&format!("{}/data/latest.json", server.url()))
        .await
        .unwrap();

    assert_eq!(forecast.hours.len(), 2);
    assert_eq!(forecast.model_ids(), vec!["gfs", "icon"]);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_load_remote_not_found() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", snapshot_path())
        .with_status(404)
        .create_async()
        .await;

    let loader = ForecastLoader::new().unwrap();
    let result = loader
        .load(&format!("{}/data/latest.json", server.url()))
        .await;

    match result.unwrap_err() {
        LoadError::Status { url, status } => {
            assert_eq!(status, 404);
            assert!(url.contains("/data/latest.json?ts="));
        }
        e => panic!("Expected Status error, got: {e:?}"),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_load_remote_invalid_json() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", snapshot_path())
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let loader = ForecastLoader::new().unwrap();
    let result = loader
        .load(&format!("{}/data/latest.json", server.url()))
        .await;

    assert!(matches!(result, Err(LoadError::Parse(_))));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_load_local_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();

    let loader = ForecastLoader::new().unwrap();
    let forecast = loader.load(file.path().to_str().unwrap()).await.unwrap();

    assert_eq!(forecast.hours.len(), 2);
    assert_eq!(forecast.hours[1].reading("gfs").unwrap().wind, Some(13.0));
}

#[tokio::test]
async fn test_load_missing_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let loader = ForecastLoader::new().unwrap();
    let result = loader.load(path.to_str().unwrap()).await;

    match result.unwrap_err() {
        LoadError::Io { path: reported, .. } => assert!(reported.ends_with("missing.json")),
        e => panic!("Expected Io error, got: {e:?}"),
    }
}

#[test]
fn test_error_display() {
    let err = LoadError::Status {
        url: "https://example.org/latest.json".to_string(),
        status: 503,
    };
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("latest.json"));
}
