use folio_core::config::builtin;
use folio_core::config::Role;
use folio_core::error::FolioError;

pub fn list() -> Result<(), FolioError> {
    println!("Built-in record profiles:\n");
    for name in builtin::PROFILES {
        let profile = builtin::load_profile(name)?;
        let roles: Vec<String> = profile
            .signatures
            .iter()
            .map(|s| format!("{:?}", s.role))
            .collect();
        println!(
            "  {:<10} {} label(s), {} section marker(s)",
            name,
            profile.labels.len(),
            profile.section_markers.len()
        );
        println!("             signatures: {}", roles.join(", "));
        if profile.has_role(Role::SubEntry) {
            println!(
                "             sub-entries end in one of \"{}\"",
                profile.sub_entry_terminators
            );
        }
        if let Some(rows) = profile.max_field_rows {
            println!("             field values limited to {rows} row(s)");
        }
        println!();
    }
    Ok(())
}

pub fn show(name: &str) -> Result<(), FolioError> {
    print!("{}", builtin::profile_source(name)?);
    Ok(())
}
