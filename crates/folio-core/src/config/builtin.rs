use crate::config::{validate_profile, RecordProfile};
use crate::error::FolioError;

const CREATURE_TOML: &str = include_str!("../../profiles/creature.toml");
const SPELL_TOML: &str = include_str!("../../profiles/spell.toml");

/// Available built-in record profiles.
pub const PROFILES: &[&str] = &["creature", "spell"];

/// Raw TOML source of a built-in profile.
pub fn profile_source(name: &str) -> Result<&'static str, FolioError> {
    match name {
        "creature" => Ok(CREATURE_TOML),
        "spell" => Ok(SPELL_TOML),
        _ => Err(FolioError::Config(format!(
            "unknown profile '{}'. Available: {}",
            name,
            PROFILES.join(", ")
        ))),
    }
}

/// Load a built-in record profile by name.
pub fn load_profile(name: &str) -> Result<RecordProfile, FolioError> {
    let profile: RecordProfile = toml::from_str(profile_source(name)?)?;
    validate_profile(&profile)?;
    Ok(profile)
}
