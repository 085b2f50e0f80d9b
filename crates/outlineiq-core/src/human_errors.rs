// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the interactive flow.
//
// Every technical error is mapped to plain English with a clear suggestion so
// that a failed upload never leaves the user staring at a library message.

use crate::error::OutlineError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input file itself is the problem; a different file is needed.
    BadInput,
    /// Something the user can fix (a path, a setting) and try again.
    ActionRequired,
    /// Environment trouble (disk, permissions) outside the document.
    System,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert an `OutlineError` into something worth showing a person.
pub fn humanize_error(err: &OutlineError) -> HumanError {
    match err {
        OutlineError::UnreadablePdf(detail) => HumanError {
            message: "This file couldn't be read as a PDF.".into(),
            suggestion: format!(
                "The file may be damaged, empty, or not a PDF at all. Try opening it in a PDF viewer, or upload a different file. ({detail})"
            ),
            severity: Severity::BadInput,
        },

        OutlineError::Encrypted => HumanError {
            message: "This PDF is password protected.".into(),
            suggestion: "Remove the password (for example by printing it to a new PDF) and upload it again.".into(),
            severity: Severity::BadInput,
        },

        OutlineError::ImageDecode(_)
        | OutlineError::LinkResolution(_)
        | OutlineError::TextLayer(_) => HumanError {
            message: "Part of this PDF couldn't be processed.".into(),
            suggestion: "The rest of the document was still extracted; some images or links may be missing.".into(),
            severity: Severity::BadInput,
        },

        OutlineError::Config(detail) => HumanError {
            message: "A setting isn't valid.".into(),
            suggestion: format!("Check the configuration and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        OutlineError::BatchInput(detail) => HumanError {
            message: "The input folder couldn't be used.".into(),
            suggestion: format!("Make sure the folder exists and contains PDF files. ({detail})"),
            severity: Severity::ActionRequired,
        },

        OutlineError::Io(io) => match io.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "Check the file name and location, then try again.".into(),
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission was denied.".into(),
                suggestion: "Check that you can read the PDF and write to the output folder.".into(),
                severity: Severity::System,
            },
            _ => HumanError {
                message: "Reading or writing a file failed.".into(),
                suggestion: format!("Check free disk space and try again. ({io})"),
                severity: Severity::System,
            },
        },

        OutlineError::Serialization(_) => HumanError {
            message: "The results couldn't be saved as JSON.".into(),
            suggestion: "Try again; if this keeps happening, please report the file that caused it.".into(),
            severity: Severity::System,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_pdf_asks_for_another_file() {
        let human = humanize_error(&OutlineError::UnreadablePdf("no %PDF header".into()));
        assert_eq!(human.severity, Severity::BadInput);
        assert!(human.suggestion.contains("no %PDF header"));
    }

    #[test]
    fn encrypted_pdf_mentions_password() {
        let human = humanize_error(&OutlineError::Encrypted);
        assert!(human.message.contains("password"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let human = humanize_error(&OutlineError::Io(io));
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn permission_problem_is_system() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro");
        let human = humanize_error(&OutlineError::Io(io));
        assert_eq!(human.severity, Severity::System);
    }
}
