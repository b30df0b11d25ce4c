//! Decoder for the launcher's binary configuration file.
//!
//! The file is a stream of records. Each record header carries the record
//! size, the title's launch id, and an embedded structured-text payload that
//! describes the title. Headers come in two layouts that differ only in how a
//! size byte equal to the size tag is read; the walk tries the common layout
//! first and falls back to the other when the next record marker is missing.

use tracing::{debug, info, warn};
use ubitrack_model::{GameDescriptor, GameKind, GameStatus};

use crate::LauncherError;
use crate::cursor::{ID_TAG, PAYLOAD_TAG, RECORD_MARKER, RecordCursor, SIZE_TAG, Stop};
use crate::install_state::installed_status;
use crate::manifest::{EmbeddedPlatform, LAUNCHABLE_MARKER, Manifest};
use crate::registry::{InstallRegistry, resolve_local_path};
use crate::steam::EmbeddedStatusProbe;

/// Payloads shorter than this keep a one-byte inner length even when the
/// outer size needed two.
const SHORT_PAYLOAD: i64 = 128;

/// Header layout used to read a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// A size byte equal to the size tag only counts before any other byte.
    Primary,
    /// A size byte equal to the size tag counts when the tag repeats.
    Secondary,
}

/// Sizes read from one record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub payload_size: usize,
    pub launch_id: u64,
    /// Bytes from the record start to the payload.
    pub header_size: usize,
}

/// Location of one title's payload inside the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationRecord {
    pub launch_id: u64,
    pub offset: usize,
    pub size: usize,
}

impl ConfigurationRecord {
    /// Returns the payload bytes, or `None` if the span is outside `data`.
    pub fn payload<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.offset..self.offset.checked_add(self.size)?)
    }
}

/// Result of walking the configuration file.
///
/// `records` holds everything decoded before `error`, if the walk stopped
/// early.
#[derive(Debug, Default)]
pub struct RecordWalk {
    pub records: Vec<ConfigurationRecord>,
    pub error: Option<LauncherError>,
}

/// Host services used to project payloads into descriptors.
#[derive(Clone, Copy)]
pub struct LocalEnvironment<'a> {
    pub registry: &'a dyn InstallRegistry,
    pub embedded: &'a dyn EmbeddedStatusProbe,
}

/// Parses one record header from `data` (which starts at the record marker).
pub fn parse_configuration_header(
    data: &[u8],
    mode: HeaderMode,
) -> Result<RecordHeader, LauncherError> {
    let mut cursor = RecordCursor::new(data, 1);

    let size_stop = match mode {
        HeaderMode::Primary => Stop::TagAfterValue(SIZE_TAG),
        HeaderMode::Secondary => Stop::UnrepeatedTag(SIZE_TAG),
    };
    let (record_size, size_len) = cursor.read_value(size_stop)?;
    cursor.advance(1)?;

    let (launch_id, _) = cursor.read_value(Stop::UnrepeatedTag(ID_TAG))?;
    cursor.advance(1)?;

    cursor.skip_until(Stop::UnrepeatedTag(PAYLOAD_TAG))?;
    let offset = cursor.position() as i64;

    let mut record_size = i64::try_from(record_size)
        .map_err(|_| LauncherError::malformed(1, "record size out of range"))?;
    let mut size_len = size_len as i64;

    if record_size - offset < SHORT_PAYLOAD && SHORT_PAYLOAD <= record_size {
        size_len -= 1;
        record_size += 1;
    }

    let payload_size = record_size - offset;
    if payload_size < 0 {
        return Err(LauncherError::malformed(
            offset as usize,
            format!("record size {record_size} ends inside its header"),
        ));
    }

    Ok(RecordHeader {
        payload_size: payload_size as usize,
        launch_id,
        header_size: (offset + size_len + 1) as usize,
    })
}

/// Walks a configuration file held in memory.
pub struct ConfigurationDecoder<'a> {
    data: &'a [u8],
}

impl<'a> ConfigurationDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Splits the file into per-title payload spans.
    ///
    /// A repeated launch id replaces the earlier span in place. A header that
    /// cannot be read, or a payload that runs past the end of the file, stops
    /// the walk; spans decoded before it are kept.
    pub fn walk(&self) -> RecordWalk {
        let mut records = Vec::new();
        let error = self.walk_into(&mut records).err();
        if let Some(e) = &error {
            warn!(
                error = %e,
                recovered = records.len(),
                "configuration walk stopped early, file may be corrupted or mid-write"
            );
        }
        RecordWalk { records, error }
    }

    fn walk_into(&self, records: &mut Vec<ConfigurationRecord>) -> Result<(), LauncherError> {
        let data = self.data;
        let mut offset = 0;

        while offset < data.len() {
            let record = &data[offset..];
            let mut header = parse_configuration_header(record, HeaderMode::Primary)
                .map_err(|e| e.rebase(offset))?;
            let mut next = record_end(offset, &header)?;

            if data.get(next).is_some_and(|&b| b != RECORD_MARKER) {
                header = parse_configuration_header(record, HeaderMode::Secondary)
                    .map_err(|e| e.rebase(offset))?;
                next = record_end(offset, &header)?;
                debug!(offset, launch_id = header.launch_id, "record read with secondary header");
            }

            if next > data.len() {
                return Err(LauncherError::malformed(
                    offset,
                    format!(
                        "payload of {} bytes overruns the file ({} bytes left)",
                        header.payload_size,
                        data.len() - offset
                    ),
                ));
            }

            let entry = ConfigurationRecord {
                launch_id: header.launch_id,
                offset: offset + header.header_size,
                size: header.payload_size,
            };
            match records.iter_mut().find(|r| r.launch_id == entry.launch_id) {
                Some(existing) => *existing = entry,
                None => records.push(entry),
            }

            offset = next;
        }

        Ok(())
    }

    /// Decodes every launchable title in the file.
    ///
    /// Walks the file once, then projects each payload lazily. Payloads that
    /// are not launchable or fail to parse are skipped.
    pub fn games<'s>(
        &'s self,
        env: LocalEnvironment<'s>,
    ) -> impl Iterator<Item = GameDescriptor> + 's {
        let data = self.data;
        self.walk()
            .records
            .into_iter()
            .filter_map(move |record| project_record(data, &record, env))
    }
}

fn record_end(offset: usize, header: &RecordHeader) -> Result<usize, LauncherError> {
    offset
        .checked_add(header.header_size)
        .and_then(|v| v.checked_add(header.payload_size))
        .ok_or_else(|| LauncherError::malformed(offset, "record size overflows"))
}

fn project_record(
    data: &[u8],
    record: &ConfigurationRecord,
    env: LocalEnvironment<'_>,
) -> Option<GameDescriptor> {
    if record.size == 0 {
        return None;
    }
    let text = utf8_dropping_invalid(record.payload(data)?);
    if !text.contains(LAUNCHABLE_MARKER) {
        return None;
    }

    match Manifest::parse(&text) {
        Ok(manifest) => Some(describe(&manifest, record.launch_id, env)),
        Err(e) => {
            warn!(launch_id = record.launch_id, error = %e, "skipping unreadable configuration payload");
            None
        }
    }
}

/// Decodes UTF-8, dropping invalid sequences.
fn utf8_dropping_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Splits the vendor install key out of an uninstall-registry reference.
///
/// `HKEY_LOCAL_MACHINE\SOFTWARE\...\Uninstall\Game 1\InstallLocation`
/// becomes `SOFTWARE\...\Uninstall\Game 1`.
pub fn uninstall_key_path(register: &str) -> Option<String> {
    if !register.contains("Uninstall") {
        return None;
    }
    let (_, key) = register.split_once(r"HKEY_LOCAL_MACHINE\")?;
    let key = key
        .split_once(r"\InstallLocation")
        .map_or(key, |(path, _)| path);
    Some(key.to_string())
}

/// Projects a parsed payload into a descriptor, probing local install state.
pub fn describe(manifest: &Manifest, launch_id: u64, env: LocalEnvironment<'_>) -> GameDescriptor {
    let launch_id = launch_id.to_string();
    let mut game = GameDescriptor::new(manifest.display_name())
        .with_launch_id(launch_id.clone())
        .with_status(GameStatus::NotInstalled);

    match manifest.space_id() {
        Some(space_id) => {
            game.space_id = Some(space_id.to_string());
            game.kind = GameKind::Native;
        }
        None => game.kind = GameKind::LegacyNative,
    }

    match manifest.embedded_platform() {
        Some(EmbeddedPlatform::Steam) => {
            game.kind = GameKind::EmbeddedSteam;
            game.local_path = manifest.steam_status_register().map(str::to_string);
            game.third_party_id = manifest.steam_app_id().map(str::to_string);
            game.status = env
                .embedded
                .probe_status(game.local_path.as_deref().unwrap_or_default());
        }
        Some(EmbeddedPlatform::Origin) => {
            game.kind = GameKind::EmbeddedOrigin;
            game.local_path = manifest.origin_status_register().map(str::to_string);
        }
        Some(EmbeddedPlatform::Other) => {
            debug!(launch_id = %launch_id, "unsupported embedded platform");
        }
        None => {
            match manifest.working_directory_register() {
                Some(register) => {
                    if let Some(key) = uninstall_key_path(register) {
                        game.fallback_registry_path = Some(key);
                        game.executable = manifest.relative_executable().map(str::to_string);
                    }
                }
                None => debug!(launch_id = %launch_id, "no working directory register"),
            }

            game.local_path = resolve_local_path(
                env.registry,
                Some(&launch_id),
                game.fallback_registry_path.as_deref(),
            );
            if let Some(path) = &game.local_path {
                game.status = installed_status(
                    path,
                    game.executable.as_deref(),
                    game.fallback_registry_path.as_deref(),
                );
            }
        }
    }

    info!(
        space_id = game.space_id().unwrap_or("-"),
        launch_id = %launch_id,
        name = %game.name,
        "parsed game from configuration"
    );
    game
}
