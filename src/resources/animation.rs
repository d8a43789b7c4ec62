//! Read-only inspection of the animation clips inside a glTF/GLB buffer.
//!
//! Decoding for rendering is the engine's job; this only reads the document
//! so that missing clips show up in the log before the engine gets the model.

/// Names of all animation clips in the model. Unnamed clips are reported as `Default`.
pub fn clip_names(buffer: &[u8]) -> anyhow::Result<Vec<String>> {
    let gltf = gltf::Gltf::from_slice(buffer)?;
    let names = gltf
        .animations()
        .map(|animation| animation.name().unwrap_or("Default").to_string())
        .collect();
    Ok(names)
}

/// The subset of `required` that the model does not provide.
pub fn missing_clips<'a>(buffer: &[u8], required: &[&'a str]) -> anyhow::Result<Vec<&'a str>> {
    let names = clip_names(buffer)?;
    Ok(required
        .iter()
        .copied()
        .filter(|clip| !names.iter().any(|name| name == clip))
        .collect())
}
