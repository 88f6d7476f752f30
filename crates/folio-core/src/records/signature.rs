use crate::config::{Role, SignatureDef};
use crate::model::LogicalLine;

/// Set of roles one line's (font, size, style) signature satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    fn bit(role: Role) -> u8 {
        match role {
            Role::RecordHeader => 1,
            Role::Confirm => 1 << 1,
            Role::Label => 1 << 2,
            Role::SubEntry => 1 << 3,
        }
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= Self::bit(role);
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Declarative (font, size, style) -> role table, evaluated once per line.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    entries: Vec<SignatureDef>,
}

impl SignatureTable {
    pub fn new(defs: &[SignatureDef]) -> Self {
        let entries = defs
            .iter()
            .cloned()
            .map(|mut d| {
                d.font = d.font.map(|f| f.to_lowercase());
                d
            })
            .collect();
        SignatureTable { entries }
    }

    pub fn roles(&self, line: &LogicalLine) -> RoleSet {
        let font = line.font.to_lowercase();
        let mut set = RoleSet::default();
        for def in &self.entries {
            if matches(def, &font, line) {
                set.insert(def.role);
            }
        }
        set
    }

    pub fn roles_for(&self, lines: &[LogicalLine]) -> Vec<RoleSet> {
        lines.iter().map(|l| self.roles(l)).collect()
    }
}

fn matches(def: &SignatureDef, font_lower: &str, line: &LogicalLine) -> bool {
    def.font.as_deref().map_or(true, |f| font_lower.contains(f))
        && def.min_size.map_or(true, |min| line.size >= min)
        && def.max_size.map_or(true, |max| line.size <= max)
        && def.bold.map_or(true, |b| line.style.bold == b)
        && def.italic.map_or(true, |i| line.style.italic == i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, StyleFlags, TextSpan};

    fn line(font: &str, size: f32, style: StyleFlags) -> LogicalLine {
        LogicalLine::from_span(TextSpan {
            text: "x".into(),
            font: font.into(),
            size,
            style,
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            page: 1,
            column: 0,
        })
    }

    fn def(role: Role, bold: Option<bool>, italic: Option<bool>, min: Option<f32>) -> SignatureDef {
        SignatureDef {
            role,
            font: None,
            min_size: min,
            max_size: None,
            bold,
            italic,
        }
    }

    #[test]
    fn test_roles_by_style_and_size() {
        let table = SignatureTable::new(&[
            def(Role::RecordHeader, Some(true), Some(false), Some(12.0)),
            def(Role::Label, Some(true), Some(false), None),
            def(Role::SubEntry, Some(true), Some(true), None),
        ]);

        let header = table.roles(&line("Serif-Bold", 13.0, StyleFlags::BOLD));
        assert!(header.contains(Role::RecordHeader));
        assert!(header.contains(Role::Label));
        assert!(!header.contains(Role::SubEntry));

        let label = table.roles(&line("Serif-Bold", 9.0, StyleFlags::BOLD));
        assert!(!label.contains(Role::RecordHeader));
        assert!(label.contains(Role::Label));

        let trait_name = table.roles(&line("Serif-BoldItalic", 9.0, StyleFlags::BOLD_ITALIC));
        assert!(trait_name.contains(Role::SubEntry));
        assert!(!trait_name.contains(Role::Label));

        assert!(table.roles(&line("Serif", 9.0, StyleFlags::PLAIN)).is_empty());
    }

    #[test]
    fn test_font_substring_is_case_insensitive() {
        let table = SignatureTable::new(&[SignatureDef {
            role: Role::Confirm,
            font: Some("Italic".into()),
            min_size: None,
            max_size: None,
            bold: None,
            italic: None,
        }]);
        assert!(table
            .roles(&line("ABCDEF+Calibri-ITALIC", 9.0, StyleFlags::PLAIN))
            .contains(Role::Confirm));
    }
}
