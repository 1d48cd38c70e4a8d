//! Tool registry
//!
//! Maps a tool id to the internal CLI subcommand that runs it. Built once at
//! startup and shared by reference.

use std::collections::HashMap;

/// Lookup from tool id to its CLI fragment
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    commands: HashMap<String, String>,
}

impl ToolRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry of every tool shipped with the internal CLI
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register("files-unlink", "files unlink");
        registry.register("files-delete", "files delete");

        registry.register("alignment-index", "alignment index");
        registry.register("alignment-coverage-run", "alignment coverage-run");
        registry.register("alignment-stats-run", "alignment stats-run");
        registry.register("alignment-bwa", "alignment bwa");
        registry.register("alignment-samtools", "alignment samtools");
        registry.register("alignment-deeptools", "alignment deeptools");

        registry.register("variant-index", "variant index");
        registry.register("variant-export", "variant export");
        registry.register("variant-stats", "variant stats-run");
        registry.register("variant-stats-export", "variant stats-export");
        registry.register("sample-variant-stats", "variant sample-stats-run");
        registry.register("cohort-variant-stats", "variant cohort-stats-run");
        registry.register("gwas", "variant gwas-run");
        registry.register("plink", "variant plink-run");
        registry.register("rvtests", "variant rvtests-run");
        registry.register("variant-file-delete", "variant delete");
        registry.register("variant-secondary-index", "variant secondary-index");
        registry.register(
            "variant-secondary-index-samples-delete",
            "variant secondary-index-delete",
        );
        registry.register("variant-score-delete", "variant score-delete");
        registry.register("variant-score-index", "variant score-index");
        registry.register("variant-sample-index", "variant sample-index");
        registry.register("variant-family-index", "variant family-index");
        registry.register("variant-aggregate-family", "variant aggregate-family");
        registry.register("variant-aggregate", "variant aggregate");
        registry.register("variant-annotation-index", "variant annotation-index");
        registry.register("variant-annotation-delete", "variant annotation-delete");
        registry.register("variant-annotation-save", "variant annotation-save");

        registry.register("team-interpretation", "interpretation team-interpretation");
        registry.register("tiering-interpretation", "interpretation tiering-interpretation");
        registry.register("custom-interpretation", "interpretation custom-interpretation");
        registry.register(
            "cancer-tiering-interpretation",
            "interpretation cancer-tiering-interpretation",
        );

        registry
    }

    /// Registers (or replaces) a tool
    pub fn register(&mut self, tool_id: &str, command: &str) {
        self.commands
            .insert(tool_id.to_string(), command.to_string());
    }

    /// CLI fragment of a tool, if known
    pub fn command(&self, tool_id: &str) -> Option<&str> {
        self.commands.get(tool_id).map(String::as_str)
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.commands.contains_key(tool_id)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
