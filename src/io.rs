use std::io;

use bytes::{Buf, Bytes};
use futures::stream::StreamExt;
use warp::multipart::{FormData, Part};

use crate::errors::BackendError;
use crate::recording::RecordingMetadata;
use crate::song::SongMetadata;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One uploaded file, fully read.
#[derive(Clone, Debug)]
pub struct FilePart {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A multipart song-creation submission: a `metadata` JSON part plus
/// optional `cover`, `audio` and `lrc` file parts.
#[derive(Debug)]
pub struct SongUpload {
    pub metadata: SongMetadata,
    pub cover: Option<FilePart>,
    pub audio: Option<FilePart>,
    pub lrc: Option<FilePart>,
}

/// A multipart song update: any subset of the three file parts.
#[derive(Debug, Default)]
pub struct SongPatch {
    pub cover: Option<FilePart>,
    pub audio: Option<FilePart>,
    pub lrc: Option<FilePart>,
}

/// A multipart recording submission: a `metadata` JSON part plus the
/// `audio` file part.
#[derive(Debug)]
pub struct RecordingUpload {
    pub metadata: RecordingMetadata,
    pub audio: FilePart,
}

pub async fn parse_song_upload(form: FormData) -> Result<SongUpload, BackendError> {
    let mut parts = collect_parts(form).await?;

    let metadata = parse_metadata(&mut parts)?;

    Ok(SongUpload {
        metadata,
        cover: take_file(&mut parts, "cover"),
        audio: take_file(&mut parts, "audio"),
        lrc: take_file(&mut parts, "lrc"),
    })
}

pub async fn parse_song_patch(form: FormData) -> Result<SongPatch, BackendError> {
    let mut parts = collect_parts(form).await?;

    let patch = SongPatch {
        cover: take_file(&mut parts, "cover"),
        audio: take_file(&mut parts, "audio"),
        lrc: take_file(&mut parts, "lrc"),
    };

    if patch.cover.is_none() && patch.audio.is_none() && patch.lrc.is_none() {
        return Err(BackendError::PartsMissing);
    }

    Ok(patch)
}

/// Parses a form carrying only a replacement `audio` part.
pub async fn parse_recording_audio(form: FormData) -> Result<FilePart, BackendError> {
    let mut parts = collect_parts(form).await?;

    take_file(&mut parts, "audio").ok_or(BackendError::PartsMissing)
}

pub async fn parse_recording_upload(form: FormData) -> Result<RecordingUpload, BackendError> {
    let mut parts = collect_parts(form).await?;

    let metadata = parse_metadata(&mut parts)?;
    let audio = take_file(&mut parts, "audio").ok_or(BackendError::PartsMissing)?;

    Ok(RecordingUpload { metadata, audio })
}

async fn collect_parts(mut form: FormData) -> Result<Vec<(String, FilePart)>, BackendError> {
    let mut collected = vec![];

    while let Some(part) = form.next().await {
        let part = part.map_err(|_| BackendError::MalformedFormSubmission)?;

        let name = part.name().to_owned();
        let content_type = part
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let data = part_as_vec(part)
            .await
            .map_err(|_| BackendError::MalformedFormSubmission)?;

        collected.push((name, FilePart { content_type, data }));
    }

    Ok(collected)
}

fn parse_metadata<M: serde::de::DeserializeOwned>(
    parts: &mut Vec<(String, FilePart)>,
) -> Result<M, BackendError> {
    let metadata = take_file(parts, "metadata").ok_or(BackendError::PartsMissing)?;

    serde_json::from_slice(&metadata.data)
        .map_err(|source| BackendError::MalformedUploadMetadata { source })
}

fn take_file(parts: &mut Vec<(String, FilePart)>, name: &str) -> Option<FilePart> {
    let index = parts.iter().position(|(n, _)| n == name)?;

    Some(parts.remove(index).1)
}

/// Collects chunks of [`Part`].
pub async fn part_as_vec(raw: Part) -> Result<Vec<u8>, ()> {
    let vec_of_results = part_as_stream(raw).collect::<Vec<_>>().await;

    let vec_of_vecs = vec_of_results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ())?;

    Ok(vec_of_vecs.concat())
}

/// Collects raw data from [`Part`].
pub fn part_as_stream(raw: Part) -> impl futures::Stream<Item = Result<Bytes, io::Error>> {
    raw.stream().map(|r| {
        r.map(|mut buf| buf.copy_to_bytes(buf.remaining()))
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "could not retrieve chunk"))
    })
}
