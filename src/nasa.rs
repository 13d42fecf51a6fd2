// Photo acquisition: list the latest rover photos, pick one at random,
// download it and store it under the save directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{decode_json, ensure_success};
use crate::progress::with_spinner;

/// One entry of the rover listing, reduced to what the run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub id: Option<u64>,
    pub sol: Option<u32>,
    pub source_url: String,
    pub rover_name: String,
    pub camera_name: String,
    pub capture_date: NaiveDate,
}

/// A photo that has been written to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredPhoto {
    pub photo: PhotoRecord,
    pub saved_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LatestPhotosResponse {
    latest_photos: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    sol: Option<u32>,
    img_src: String,
    earth_date: NaiveDate,
    camera: RawCamera,
    rover: RawRover,
}

#[derive(Debug, Deserialize)]
struct RawCamera {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RawRover {
    name: String,
}

impl From<RawPhoto> for PhotoRecord {
    fn from(raw: RawPhoto) -> Self {
        PhotoRecord {
            id: raw.id,
            sol: raw.sol,
            source_url: raw.img_src,
            rover_name: raw.rover.name,
            camera_name: raw.camera.full_name,
            capture_date: raw.earth_date,
        }
    }
}

/// Client for the Mars rover photo API.
#[derive(Clone)]
pub struct NasaClient {
    client: Client,
    listing_url: String,
    api_key: String,
    rover: String,
}

impl NasaClient {
    pub fn new(client: Client, config: &Config) -> Self {
        NasaClient {
            client,
            listing_url: config.latest_photos_url(),
            api_key: config.nasa_api_key.clone(),
            rover: config.rover.clone(),
        }
    }

    pub fn rover(&self) -> &str {
        &self.rover
    }

    /// Fetch the latest photos of the configured rover.
    pub fn latest_photos(&self) -> Result<Vec<PhotoRecord>> {
        const OP: &str = "fetch latest photos";

        debug!(url = %self.listing_url, "requesting latest photos");
        let res = self
            .client
            .get(&self.listing_url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .map_err(Error::network(OP))?;
        let res = ensure_success(res, OP)?;
        let body: LatestPhotosResponse = decode_json(res, OP)?;
        Ok(body.latest_photos.into_iter().map(PhotoRecord::from).collect())
    }

    /// Download the raw image bytes behind `url`.
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        const OP: &str = "download image";

        let res = self.client.get(url).send().map_err(Error::network(OP))?;
        let res = ensure_success(res, OP)?;
        let bytes = res.bytes().map_err(Error::network(OP))?;
        Ok(bytes.to_vec())
    }
}

/// Pick one photo with a uniform index over `[0, len)`.
pub fn choose_photo<'a, R>(photos: &'a [PhotoRecord], rng: &mut R) -> Option<&'a PhotoRecord>
where
    R: Rng,
{
    if photos.is_empty() {
        return None;
    }
    photos.get(rng.random_range(0..photos.len()))
}

/// Last non-empty path segment of `url`, ignoring query and fragment.
pub fn image_file_name(url: &str) -> Result<String> {
    let invalid = || Error::InvalidImageUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .map(str::to_string)
        .ok_or_else(invalid)
}

/// List, choose, download, and save one random photo.
///
/// Fails with `Error::EmptyResult` before touching the filesystem when the
/// listing is empty. An existing file with the same name is overwritten.
pub fn fetch_random_photo<R>(
    nasa: &NasaClient,
    save_dir: &Path,
    rng: &mut R,
) -> Result<AcquiredPhoto>
where
    R: Rng,
{
    let photos = nasa.latest_photos()?;
    info!(count = photos.len(), rover = nasa.rover(), "fetched latest photos");

    let photo = choose_photo(&photos, rng)
        .cloned()
        .ok_or_else(|| Error::EmptyResult {
            rover: nasa.rover().to_string(),
        })?;
    info!(
        rover = %photo.rover_name,
        camera = %photo.camera_name,
        earth_date = %photo.capture_date,
        sol = ?photo.sol,
        url = %photo.source_url,
        "selected random photo"
    );

    let file_name = image_file_name(&photo.source_url)?;

    fs::create_dir_all(save_dir)
        .map_err(Error::filesystem("failed to create save directory", save_dir))?;

    let bytes = with_spinner("Downloading image...", || nasa.download(&photo.source_url))?;

    let saved_path = save_dir.join(file_name);
    fs::write(&saved_path, &bytes)
        .map_err(Error::filesystem("failed to write image", &saved_path))?;
    info!(path = %saved_path.display(), bytes = bytes.len(), "image saved");

    Ok(AcquiredPhoto { photo, saved_path })
}
