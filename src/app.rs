// Orchestration: acquire a photo, publish it, then remove the local copy.
//
// Acquisition errors end the run. Publication reports its own outcome and
// never prevents cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::blocking::Client;
use tracing::{error, info};

use crate::bluesky::{publish_photo, BlueskyClient, PostDraft, PublishOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::nasa::{fetch_random_photo, NasaClient, PhotoRecord};

/// What happened during one run.
#[derive(Debug)]
pub struct RunReport {
    pub photo: PhotoRecord,
    pub saved_path: PathBuf,
    pub publish: PublishOutcome,
    pub removed: bool,
}

/// Caption posted alongside the photo.
pub fn compose_caption(photo: &PhotoRecord) -> String {
    format!(
        "📸 Random Latest Mars Rover Photo 📸\n\n\
         🚀 Rover: {rover}\n\
         📅 Date: {date}\n\
         📷 Camera: {camera}\n\n\
         Explore the Red Planet! 🪐\n\n\
         Photo Credit: NASA's Mars Rovers\n\n\
         #Mars #Space #Astronomy #RedPlanet ",
        rover = photo.rover_name,
        date = photo.capture_date,
        camera = photo.camera_name,
    )
}

/// Alt text for the embedded image.
pub fn compose_alt_text(photo: &PhotoRecord) -> String {
    format!(
        "Photo taken by the {} rover's {} on {}",
        photo.rover_name, photo.camera_name, photo.capture_date
    )
}

/// Delete the downloaded image.
pub fn remove_local_image(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(Error::filesystem("failed to remove image", path))
}

/// Remove the local image, logging rather than returning any failure.
/// Returns whether the file was removed.
pub fn clean_up(path: &Path) -> bool {
    match remove_local_image(path) {
        Ok(()) => {
            info!(path = %path.display(), "local image removed");
            true
        }
        Err(err) => {
            error!(error = %err, "error removing file");
            false
        }
    }
}

/// Run the whole pipeline once with the given HTTP client.
pub fn run(config: &Config, client: Client) -> Result<RunReport> {
    let nasa = NasaClient::new(client.clone(), config);
    let bluesky = BlueskyClient::new(client, config.bluesky_service.as_str());

    let acquired = fetch_random_photo(&nasa, &config.save_dir, &mut rand::rng())?;

    let draft = PostDraft {
        text: compose_caption(&acquired.photo),
        image_path: acquired.saved_path.clone(),
        alt: compose_alt_text(&acquired.photo),
    };
    let publish = publish_photo(&bluesky, &config.credentials, &draft, Utc::now());

    let removed = clean_up(&acquired.saved_path);

    Ok(RunReport {
        photo: acquired.photo,
        saved_path: acquired.saved_path,
        publish,
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn photo() -> PhotoRecord {
        PhotoRecord {
            id: Some(1),
            sol: Some(4000),
            source_url: "https://x/a.jpg".into(),
            rover_name: "Curiosity".into(),
            camera_name: "Front Hazard Avoidance Camera".into(),
            capture_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
        }
    }

    #[test]
    fn caption_embeds_photo_details() {
        assert_eq!(
            compose_caption(&photo()),
            "📸 Random Latest Mars Rover Photo 📸\n\n🚀 Rover: Curiosity\n📅 Date: 2024-01-01\n📷 Camera: Front Hazard Avoidance Camera\n\nExplore the Red Planet! 🪐\n\nPhoto Credit: NASA's Mars Rovers\n\n#Mars #Space #Astronomy #RedPlanet "
        );
    }

    #[test]
    fn caption_hashtags_become_tag_facets() {
        let caption = compose_caption(&photo());
        let facets = crate::richtext::detect_facets(&caption, |_| None);
        let spans: Vec<&str> = facets
            .iter()
            .map(|f| &caption[f.index.byte_start..f.index.byte_end])
            .collect();
        assert_eq!(spans, vec!["#Mars", "#Space", "#Astronomy", "#RedPlanet"]);
    }

    #[test]
    fn alt_text_describes_photo() {
        assert_eq!(
            compose_alt_text(&photo()),
            "Photo taken by the Curiosity rover's Front Hazard Avoidance Camera on 2024-01-01"
        );
    }

    #[test]
    fn removing_missing_image_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = remove_local_image(&dir.path().join("gone.jpg")).expect_err("missing file");
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn clean_up_reports_failure_without_raising() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!clean_up(&dir.path().join("gone.jpg")));
    }

    #[test]
    fn clean_up_removes_existing_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"jpeg").expect("write image");
        assert!(clean_up(&path));
        assert!(!path.exists());
    }
}
