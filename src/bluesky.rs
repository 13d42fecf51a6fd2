// Social publication: a minimal XRPC client for Bluesky plus the
// login -> upload -> post flow used to publish a photo.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::{decode_json, ensure_success, is_bad_request, read_error_body};
use crate::progress::with_spinner;
use crate::richtext::{detect_facets, Facet};

pub const IMAGE_JPEG: &str = "image/jpeg";
const POST_COLLECTION: &str = "app.bsky.feed.post";
const IMAGES_EMBED: &str = "app.bsky.embed.images";

/// Authenticated session returned by `com.atproto.server.createSession`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Blob reference as stored in records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    #[serde(rename = "$type", default = "blob_type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: CidLink,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
}

fn blob_type() -> String {
    "blob".to_string()
}

impl BlobRef {
    pub fn new(cid: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        BlobRef {
            kind: blob_type(),
            reference: CidLink { link: cid.into() },
            mime_type: mime_type.into(),
            size,
        }
    }

    pub fn cid(&self) -> &str {
        &self.reference.link
    }
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: BlobRef,
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedImage {
    pub alt: String,
    pub image: BlobRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagesEmbed {
    #[serde(rename = "$type")]
    pub kind: &'static str,
    pub images: Vec<EmbeddedImage>,
}

/// `app.bsky.feed.post` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    pub embed: ImagesEmbed,
    pub created_at: String,
}

impl PostRecord {
    /// Post with a single embedded image.
    pub fn with_image(
        text: impl Into<String>,
        facets: Vec<Facet>,
        image: BlobRef,
        alt: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        PostRecord {
            kind: POST_COLLECTION,
            text: text.into(),
            facets,
            embed: ImagesEmbed {
                kind: IMAGES_EMBED,
                images: vec![EmbeddedImage {
                    alt: alt.into(),
                    image,
                }],
            },
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: &'a PostRecord,
}

/// Reference to a created post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

/// Blocking XRPC client bound to one service endpoint.
#[derive(Clone)]
pub struct BlueskyClient {
    client: Client,
    service: String,
}

impl BlueskyClient {
    pub fn new(client: Client, service: impl Into<String>) -> Self {
        let service = service.into();
        BlueskyClient {
            client,
            service: service.trim_end_matches('/').to_string(),
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service, method)
    }

    fn bearer(session: &Session) -> String {
        format!("Bearer {}", session.access_jwt)
    }

    /// Log in with handle and password.
    pub fn login(&self, credentials: &Credentials) -> Result<Session> {
        const OP: &str = "create session";

        let res = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&CreateSessionRequest {
                identifier: &credentials.handle,
                password: &credentials.password,
            })
            .send()
            .map_err(Error::network(OP))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Authentication {
                status,
                message: read_error_body(res),
            });
        }
        decode_json(res, OP)
    }

    /// Resolve `handle` to a DID. Unknown handles give `Ok(None)`.
    pub fn resolve_handle(&self, session: &Session, handle: &str) -> Result<Option<String>> {
        const OP: &str = "resolve handle";

        let res = self
            .client
            .get(self.xrpc("com.atproto.identity.resolveHandle"))
            .query(&[("handle", handle)])
            .header(AUTHORIZATION, Self::bearer(session))
            .send()
            .map_err(Error::network(OP))?;
        if is_bad_request(res.status()) {
            return Ok(None);
        }
        let res = ensure_success(res, OP)?;
        let body: ResolveHandleResponse = decode_json(res, OP)?;
        Ok(Some(body.did))
    }

    /// Upload raw bytes as a blob.
    pub fn upload_blob(&self, session: &Session, bytes: Vec<u8>, mime_type: &str) -> Result<BlobRef> {
        const OP: &str = "upload blob";

        let res = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .header(AUTHORIZATION, Self::bearer(session))
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .map_err(Error::network(OP))?;
        let res = ensure_success(res, OP)?;
        let body: UploadBlobResponse = decode_json(res, OP)?;
        Ok(body.blob)
    }

    /// Create a post record in the session's repository.
    pub fn create_post(&self, session: &Session, record: &PostRecord) -> Result<PostRef> {
        const OP: &str = "create post";

        let res = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .header(AUTHORIZATION, Self::bearer(session))
            .json(&CreateRecordRequest {
                repo: &session.did,
                collection: POST_COLLECTION,
                record,
            })
            .send()
            .map_err(Error::network(OP))?;
        let res = ensure_success(res, OP)?;
        decode_json(res, OP)
    }

    /// Facets for `text`, resolving mentions through this service. A failed
    /// lookup only drops that mention.
    pub fn detect_facets(&self, session: &Session, text: &str) -> Vec<Facet> {
        detect_facets(text, |handle| match self.resolve_handle(session, handle) {
            Ok(did) => did,
            Err(err) => {
                warn!(handle, error = %err, "could not resolve mention");
                None
            }
        })
    }
}

/// Everything needed to publish one photo.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub text: String,
    pub image_path: PathBuf,
    pub alt: String,
}

/// Step of the publication flow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Login,
    ReadImage,
    Upload,
    Post,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PublishStage::Login => "login",
            PublishStage::ReadImage => "read image",
            PublishStage::Upload => "upload",
            PublishStage::Post => "post",
        })
    }
}

/// Result of a publication attempt. Failures are reported here rather
/// than returned as `Err`, so the caller decides whether they matter.
#[derive(Debug)]
pub enum PublishOutcome {
    Posted(PostRef),
    Failed { stage: PublishStage, error: Error },
}

impl PublishOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self, PublishOutcome::Posted(_))
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(Error::filesystem("failed to read image", path))
}

fn try_publish(
    bluesky: &BlueskyClient,
    credentials: &Credentials,
    draft: &PostDraft,
    created_at: DateTime<Utc>,
) -> std::result::Result<PostRef, (PublishStage, Error)> {
    let session = bluesky
        .login(credentials)
        .map_err(|e| (PublishStage::Login, e))?;
    info!(handle = %session.handle, "logged in to Bluesky");

    let bytes = read_image(&draft.image_path).map_err(|e| (PublishStage::ReadImage, e))?;
    let size = bytes.len() as u64;

    let uploaded = with_spinner("Uploading image...", || {
        bluesky.upload_blob(&session, bytes, IMAGE_JPEG)
    })
    .map_err(|e| (PublishStage::Upload, e))?;
    info!(cid = %uploaded.cid(), size, "image uploaded");
    if uploaded.size != size {
        debug!(declared = size, reported = uploaded.size, "blob size differs from upload");
    }

    let facets = bluesky.detect_facets(&session, &draft.text);
    let record = PostRecord::with_image(
        draft.text.clone(),
        facets,
        BlobRef::new(uploaded.cid(), IMAGE_JPEG, size),
        draft.alt.clone(),
        created_at,
    );

    bluesky
        .create_post(&session, &record)
        .map_err(|e| (PublishStage::Post, e))
}

/// Log in, upload the image, and post it with the draft's caption.
///
/// Never fails: every error is logged and returned inside
/// `PublishOutcome::Failed`.
pub fn publish_photo(
    bluesky: &BlueskyClient,
    credentials: &Credentials,
    draft: &PostDraft,
    created_at: DateTime<Utc>,
) -> PublishOutcome {
    match try_publish(bluesky, credentials, draft, created_at) {
        Ok(post) => {
            info!(uri = %post.uri, cid = %post.cid, "post created successfully");
            PublishOutcome::Posted(post)
        }
        Err((stage, error)) => {
            error!(%stage, error = %error, "failed to post to Bluesky");
            PublishOutcome::Failed { stage, error }
        }
    }
}
