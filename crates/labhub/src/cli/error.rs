//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Source tree does not exist
    pub fn source_not_found(path: &Path) -> Self {
        Self::new(format!("Source not found: {}", path.display()))
            .with_context("Each source must be a mounted mirror tree containing addons/")
            .with_suggestions([
                format!("TRY: Check that the mirror is mounted: ls -la {}", path.display()),
                "TRY: Pass the tree explicitly: labhub index --source <DIR>".to_string(),
                "TRY: Show the resolved configuration: labhub config".to_string(),
            ])
    }

    /// Source exists but is not a directory
    pub fn not_a_directory(path: &Path) -> Self {
        Self::new(format!("Not a directory: {}", path.display()))
            .with_context("A source must be the directory holding addons/, not a file")
            .with_suggestion(format!(
                "TRY: Use the parent directory: labhub index --source {}",
                path.parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| ".".to_string())
            ))
    }

    /// A family listed for a source has no directory
    pub fn family_root_missing(root: &Path, family: &str) -> Self {
        Self::new(format!("Missing {} directory: {}", family, root.display()))
            .with_context(format!("The source is configured to carry {} images", family))
            .with_suggestions([
                format!("TRY: Create or mount it: ls -la {}", root.display()),
                format!("TRY: Remove \"{}\" from the source's families in labhub.toml", family),
            ])
    }

    /// Config file could not be read or parsed
    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid configuration: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: Compare with the defaults: labhub config --json".to_string(),
                "TRY: Families must be one of: qemu, iol, dynamips".to_string(),
            ])
    }

    /// Catalog file does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified catalog file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                "TRY: Generate catalogs first: labhub index".to_string(),
            ])
    }

    /// Duplicates found in strict mode
    pub fn duplicates_found(path: &Path, count: usize) -> Self {
        Self::new(format!("{} duplicate value(s) in {}", count, path.display()))
            .with_context("Duplicate names or checksums usually mean an image was uploaded twice")
            .with_suggestion("TRY: Review the report above and remove the redundant copy from the mirror")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
