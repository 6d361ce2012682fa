//! The fixed lab measurement vocabulary.

use std::fmt;

/// Whether a measurement slot holds a number or free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Numeric,
    Text,
}

/// One lab measurement concept.
///
/// Each variant has exactly one canonical key: the lowercase name the value is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabKey {
    RedBloodCells,
    Hematocrit,
    Hemoglobin,
    WhiteBloodCells,
    Platelets,
    Glucose,
    Urea,
    Creatinine,
    GlomerularFiltration,
    Got,
    Gpt,
    TotalCholesterol,
    Triglycerides,
    VitaminD,
    AlkalinePhosphatase,
    Hdl,
    Ldl,
    VitaminB12,
    Tsh,
    FreeT4,
    Urine,
    UricAcid,
    Psa,
    GlycatedHemoglobin,
    UnlistedValues,
}

impl LabKey {
    /// Every slot, in display order.
    pub const ALL: [LabKey; 25] = [
        LabKey::RedBloodCells,
        LabKey::Hematocrit,
        LabKey::Hemoglobin,
        LabKey::WhiteBloodCells,
        LabKey::Platelets,
        LabKey::Glucose,
        LabKey::Urea,
        LabKey::Creatinine,
        LabKey::GlomerularFiltration,
        LabKey::Got,
        LabKey::Gpt,
        LabKey::TotalCholesterol,
        LabKey::Triglycerides,
        LabKey::VitaminD,
        LabKey::AlkalinePhosphatase,
        LabKey::Hdl,
        LabKey::Ldl,
        LabKey::VitaminB12,
        LabKey::Tsh,
        LabKey::FreeT4,
        LabKey::Urine,
        LabKey::UricAcid,
        LabKey::Psa,
        LabKey::GlycatedHemoglobin,
        LabKey::UnlistedValues,
    ];

    pub fn canonical(self) -> &'static str {
        match self {
            LabKey::RedBloodCells => "gr",
            LabKey::Hematocrit => "hto",
            LabKey::Hemoglobin => "hb",
            LabKey::WhiteBloodCells => "gb",
            LabKey::Platelets => "plaq",
            LabKey::Glucose => "gluc",
            LabKey::Urea => "urea",
            LabKey::Creatinine => "cr",
            LabKey::GlomerularFiltration => "vfg",
            LabKey::Got => "got",
            LabKey::Gpt => "gpt",
            LabKey::TotalCholesterol => "ct",
            LabKey::Triglycerides => "tg",
            LabKey::VitaminD => "vitd",
            LabKey::AlkalinePhosphatase => "fal",
            LabKey::Hdl => "hdl",
            LabKey::Ldl => "ldl",
            LabKey::VitaminB12 => "b12",
            LabKey::Tsh => "tsh",
            LabKey::FreeT4 => "t4l",
            LabKey::Urine => "orina",
            LabKey::UricAcid => "urico",
            LabKey::Psa => "psa",
            LabKey::GlycatedHemoglobin => "hba1c",
            LabKey::UnlistedValues => "valoresnoincluidos",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LabKey::RedBloodCells => "GR (Glóbulos Rojos)",
            LabKey::Hematocrit => "HTO (Hematocrito)",
            LabKey::Hemoglobin => "HB (Hemoglobina)",
            LabKey::WhiteBloodCells => "GB (Glóbulos Blancos)",
            LabKey::Platelets => "PLAQ (Plaquetas)",
            LabKey::Glucose => "GLUC (Glucosa)",
            LabKey::Urea => "UREA/UREMIA",
            LabKey::Creatinine => "CR (Creatinina)",
            LabKey::GlomerularFiltration => "VFG (Velocidad de Filtración Glomerular)",
            LabKey::Got => "GOT",
            LabKey::Gpt => "GPT",
            LabKey::TotalCholesterol => "CT (Colesterol Total)",
            LabKey::Triglycerides => "TG (Triglicéridos)",
            LabKey::VitaminD => "VITD (Vitamina D)",
            LabKey::AlkalinePhosphatase => "FAL (Fosfatasa Alcalina)",
            LabKey::Hdl => "HDL (Colesterol HDL)",
            LabKey::Ldl => "LDL (Colesterol LDL)",
            LabKey::VitaminB12 => "B12 (Vitamina B12)",
            LabKey::Tsh => "TSH",
            LabKey::FreeT4 => "T4L",
            LabKey::Urine => "ORINA",
            LabKey::UricAcid => "URICO/URICEMIA",
            LabKey::Psa => "PSA (Antígeno Prostático Específico)",
            LabKey::GlycatedHemoglobin => "HBA1C (Hemoglobina Glicosilada)",
            LabKey::UnlistedValues => "Valores no incluidos",
        }
    }

    pub fn kind(self) -> SlotKind {
        match self {
            LabKey::Urine | LabKey::UnlistedValues => SlotKind::Text,
            _ => SlotKind::Numeric,
        }
    }

    pub fn numeric() -> impl Iterator<Item = LabKey> {
        Self::ALL.into_iter().filter(|k| k.kind() == SlotKind::Numeric)
    }

    pub fn text() -> impl Iterator<Item = LabKey> {
        Self::ALL.into_iter().filter(|k| k.kind() == SlotKind::Text)
    }

    /// Looks up a key by its exact canonical name.
    pub fn from_canonical(name: &str) -> Option<LabKey> {
        Self::ALL.into_iter().find(|k| k.canonical() == name)
    }
}

impl fmt::Display for LabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_vocabulary_shape() {
        assert_eq!(LabKey::numeric().count(), 23);
        assert_eq!(LabKey::text().count(), 2);

        let names: HashSet<_> = LabKey::ALL.iter().map(|k| k.canonical()).collect();
        assert_eq!(names.len(), LabKey::ALL.len());
    }

    #[test]
    fn test_canonical_names_are_lowercase() {
        for key in LabKey::ALL {
            assert_eq!(key.canonical(), key.canonical().to_lowercase());
            assert_eq!(LabKey::from_canonical(key.canonical()), Some(key));
        }
    }
}
