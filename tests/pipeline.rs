use std::collections::HashMap;
use std::path::Path;

use httpmock::prelude::*;
use mars_rover_poster::app;
use mars_rover_poster::bluesky::{PublishOutcome, PublishStage};
use mars_rover_poster::config::Config;
use mars_rover_poster::Error;
use reqwest::blocking::Client;
use serde_json::json;

const CID: &str = "bafkreiexamplecid";

fn config_for(server: &MockServer, save_dir: &Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("NASA_API_KEY", "test-key".to_string()),
        ("NASA_API_BASE_URL", server.url("/mars-photos/api/v1")),
        ("MARS_PHOTOS_DIR", save_dir.display().to_string()),
        ("BLUESKY_SERVICE_URL", server.base_url()),
        ("BLUESKY_HANDLE", "rover.bsky.social".to_string()),
        ("BLUESKY_PASSWORD", "app-password".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned())
}

fn mock_listing(server: &MockServer) {
    let img_src = server.url("/images/a.jpg");
    server.mock(|when, then| {
        when.method(GET)
            .path("/mars-photos/api/v1/rovers/curiosity/latest_photos")
            .query_param("api_key", "test-key");
        then.status(200).json_body(json!({
            "latest_photos": [{
                "id": 1,
                "sol": 4100,
                "img_src": img_src,
                "earth_date": "2024-01-01",
                "camera": { "name": "FHAZ", "full_name": "Front Hazard Avoidance Camera" },
                "rover": { "name": "Curiosity" }
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/images/a.jpg");
        then.status(200).body("0123456789");
    });
}

#[test]
fn photo_is_posted_and_local_copy_removed() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().expect("tempdir");
    let save_dir = dir.path().join("mars_photos");
    mock_listing(&server);

    let login = server.mock(|when, then| {
        when.method(POST).path("/xrpc/com.atproto.server.createSession");
        then.status(200).json_body(json!({
            "accessJwt": "access-token",
            "refreshJwt": "refresh-token",
            "handle": "rover.bsky.social",
            "did": "did:plc:rover"
        }));
    });
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/xrpc/com.atproto.repo.uploadBlob")
            .header("authorization", "Bearer access-token")
            .body("0123456789");
        then.status(200).json_body(json!({
            "blob": { "$type": "blob", "ref": { "$link": CID }, "mimeType": "image/jpeg", "size": 10 }
        }));
    });
    let post = server.mock(|when, then| {
        when.method(POST).path("/xrpc/com.atproto.repo.createRecord");
        then.status(200).json_body(json!({
            "uri": "at://did:plc:rover/app.bsky.feed.post/3kxyz",
            "cid": "bafyreipost"
        }));
    });

    let report = app::run(&config_for(&server, &save_dir), Client::new()).expect("run succeeds");

    login.assert();
    upload.assert();
    post.assert();
    assert_eq!(report.photo.rover_name, "Curiosity");
    assert_eq!(report.photo.camera_name, "Front Hazard Avoidance Camera");
    assert_eq!(report.saved_path, save_dir.join("a.jpg"));
    match report.publish {
        PublishOutcome::Posted(post) => {
            assert_eq!(post.uri, "at://did:plc:rover/app.bsky.feed.post/3kxyz")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.removed);
    assert!(!report.saved_path.exists());
    assert!(save_dir.is_dir());
}

#[test]
fn failed_login_still_removes_local_copy() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().expect("tempdir");
    let save_dir = dir.path().join("mars_photos");
    mock_listing(&server);

    server.mock(|when, then| {
        when.method(POST).path("/xrpc/com.atproto.server.createSession");
        then.status(401).json_body(json!({
            "error": "AuthenticationRequired",
            "message": "Invalid identifier or password"
        }));
    });

    let report = app::run(&config_for(&server, &save_dir), Client::new()).expect("run succeeds");

    assert!(matches!(
        report.publish,
        PublishOutcome::Failed {
            stage: PublishStage::Login,
            error: Error::Authentication { .. }
        }
    ));
    assert!(report.removed);
    assert!(!save_dir.join("a.jpg").exists());
}

#[test]
fn empty_listing_ends_the_run_before_publishing() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().expect("tempdir");
    let save_dir = dir.path().join("mars_photos");

    server.mock(|when, then| {
        when.method(GET)
            .path("/mars-photos/api/v1/rovers/curiosity/latest_photos");
        then.status(200).json_body(json!({ "latest_photos": [] }));
    });
    let err = app::run(&config_for(&server, &save_dir), Client::new()).expect_err("empty listing");

    assert!(matches!(err, Error::EmptyResult { .. }));
    assert!(!save_dir.exists());
}
