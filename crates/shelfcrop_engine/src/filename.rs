use shelfcrop_core::Fingerprint;

const FALLBACK_IMAGE_EXTENSION: &str = "jpg";
const METADATA_EXTENSION: &str = "csv";

/// `{random token}_{fingerprint hex}`: unique per download and traceable to its content.
pub fn download_stem(fingerprint: &Fingerprint) -> String {
    let token = uuid::Uuid::new_v4().simple();
    format!("{token}_{}", fingerprint.to_hex())
}

/// Extension for raw image bytes, sniffed from the payload; `jpg` when unknown.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(FALLBACK_IMAGE_EXTENSION)
}

/// `{parent}_{index}.{ext}`
pub fn crop_filename(parent: &str, index: usize, extension: &str) -> String {
    format!("{parent}_{index}.{extension}")
}

/// `{parent}.csv`
pub fn metadata_filename(parent: &str) -> String {
    format!("{parent}.{METADATA_EXTENSION}")
}
