//! Command-line consultation entry: flags in, form fields, highlight scope and files out.

use clap::Args;
use consult_core::composer::FormData;
use consult_core::constants::{
    FORM_LAB_DATE, FORM_NOTES, FORM_ORDER, FORM_PRESCRIPTION, FORM_REASON, FORM_VISIT_DATE,
};
use consult_core::highlight::{apply_highlighted, LabScope};
use consult_core::{AttachmentPolicy, ConsultResult, PendingBatch, UploadFile, ValidationError};
use std::path::{Path, PathBuf};

/// Fields of a consultation. An edit replaces the whole consultation, so pass every field.
#[derive(Args, Debug, Default)]
pub struct EntryArgs {
    /// Reason for the consultation (required)
    #[arg(long)]
    pub reason: Option<String>,
    /// Visit date (YYYY-MM-DD or DD/MM/YYYY); defaults to today
    #[arg(long)]
    pub visit_date: Option<String>,
    /// Date the lab values were taken
    #[arg(long)]
    pub lab_date: Option<String>,
    #[arg(long)]
    pub prescription: Option<String>,
    #[arg(long)]
    pub order: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Lab value as NAME=VALUE; any known spelling of NAME is accepted
    #[arg(long = "lab", value_parser = parse_key_val)]
    pub labs: Vec<(String, String)>,
    /// Lab names to flag as notable, separated by commas or spaces
    #[arg(long)]
    pub highlight: Option<String>,
    /// File to attach; repeat for several
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,
}

pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    Ok((key.trim().to_owned(), value.trim().to_owned()))
}

impl EntryArgs {
    pub fn form(&self) -> FormData {
        let mut form = FormData::new();
        let named = [
            (FORM_REASON, &self.reason),
            (FORM_VISIT_DATE, &self.visit_date),
            (FORM_LAB_DATE, &self.lab_date),
            (FORM_PRESCRIPTION, &self.prescription),
            (FORM_ORDER, &self.order),
            (FORM_NOTES, &self.notes),
        ];
        for (name, value) in named {
            if let Some(value) = value {
                form.insert(name, value.as_str());
            }
        }
        for (name, value) in &self.labs {
            form.insert(name.as_str(), value.as_str());
        }
        form
    }

    /// The lab scope with the requested highlights applied.
    pub fn scope(&self) -> LabScope {
        let mut scope = LabScope::for_vocabulary();
        if let Some(text) = &self.highlight {
            apply_highlighted(text.as_str(), &mut scope);
        }
        scope
    }

    /// Reads the attachments into a pending batch; a repeated file name keeps the first one.
    pub fn read_attachments(&self, policy: &AttachmentPolicy) -> ConsultResult<Vec<UploadFile>> {
        let mut batch = PendingBatch::new(policy.clone());
        for path in &self.attachments {
            batch
                .add(vec![read_upload(path)?])
                .map_err(ValidationError::Attachment)?;
        }
        Ok(batch.into_files())
    }
}

pub fn read_upload(path: &Path) -> ConsultResult<UploadFile> {
    let bytes = std::fs::read(path)?;
    Ok(UploadFile::new(&path.to_string_lossy(), bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consult_core::highlight::extract_highlighted;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("hba1c = 7,2").unwrap(),
            ("hba1c".to_string(), "7,2".to_string())
        );
        assert!(parse_key_val("hba1c").is_err());
    }

    #[test]
    fn test_form_holds_named_and_lab_fields() {
        let args = EntryArgs {
            reason: Some("Control".into()),
            prescription: Some("Enalapril".into()),
            labs: vec![("COL".into(), "180".into())],
            ..Default::default()
        };
        let form = args.form();
        assert_eq!(form.get(FORM_REASON), Some("Control"));
        assert_eq!(form.get(FORM_PRESCRIPTION), Some("Enalapril"));
        assert_eq!(form.get("COL"), Some("180"));
        assert_eq!(form.get(FORM_ORDER), None);
    }

    #[test]
    fn test_scope_applies_delimited_highlights() {
        let args = EntryArgs {
            highlight: Some("hb, gluc ldl".into()),
            ..Default::default()
        };
        let keys = extract_highlighted(&args.scope());
        assert!(keys.contains("hb"));
        assert!(keys.contains("gluc"));
        assert!(keys.contains("ldl"));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_read_upload_keeps_base_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("analitica.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let upload = read_upload(&path).unwrap();
        assert_eq!(upload.original_name().as_str(), "analitica.pdf");
        assert_eq!(upload.size_bytes(), 8);
    }

    #[test]
    fn test_read_attachments_deduplicates_and_validates() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a").join("lab.pdf");
        let second = tmp.path().join("b").join("lab.pdf");
        for (path, body) in [(&first, b"one".as_slice()), (&second, b"second".as_slice())] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }

        let args = EntryArgs {
            attachments: vec![first, second],
            ..Default::default()
        };
        let files = args.read_attachments(&AttachmentPolicy::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].bytes(), b"one");

        let exe = tmp.path().join("setup.exe");
        std::fs::write(&exe, b"MZ").unwrap();
        let args = EntryArgs {
            attachments: vec![exe],
            ..Default::default()
        };
        assert!(args
            .read_attachments(&AttachmentPolicy::default())
            .unwrap_err()
            .is_validation());
    }
}
