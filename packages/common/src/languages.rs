use std::collections::HashMap;

use crate::constraints::Constraints;

/// Configuration for a programming language.
#[derive(Debug, Clone)]
pub struct Language {
    /// Human-readable name (e.g., "C++17 (GCC)").
    pub name: String,
    /// Source file name written into the sandbox (e.g., "main.cpp").
    pub source_name: String,
    /// Name of the runnable artifact after compiling. For interpreted
    /// languages this is the source file itself.
    pub artifact_name: String,
    /// Compile command template (None for interpreted languages).
    pub compile: Option<Vec<String>>,
    /// Run command template.
    pub run: Vec<String>,
    /// Constraints applied when a task does not override them.
    pub default_constraints: Constraints,
}

impl Language {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Expand `{source}` and `{binary}` placeholders in a command template.
    pub fn expand_command(command: &[String], source: &str, binary: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| arg.replace("{source}", source).replace("{binary}", binary))
            .collect()
    }
}

/// The closed set of languages submissions may use.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: HashMap<String, Language>,
}

fn vec_of(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl LanguageRegistry {
    pub fn new(languages: HashMap<String, Language>) -> Self {
        Self { languages }
    }

    /// The built-in language table.
    pub fn builtin() -> Self {
        let mut languages = HashMap::new();

        languages.insert(
            "c".to_string(),
            Language {
                name: "C11 (GCC)".into(),
                source_name: "main.c".into(),
                artifact_name: "program".into(),
                compile: Some(vec_of(&[
                    "/usr/bin/gcc", "-O2", "-std=c11", "-o", "{binary}", "{source}", "-lm",
                ])),
                run: vec_of(&["./{binary}"]),
                default_constraints: Constraints::new()
                    .with_time_ms(2000)
                    .with_memory_kb(256 * Constraints::MB)
                    .with_output_kb(64 * Constraints::MB)
                    .with_processes(1),
            },
        );

        languages.insert(
            "cpp".to_string(),
            Language {
                name: "C++17 (GCC)".into(),
                source_name: "main.cpp".into(),
                artifact_name: "program".into(),
                compile: Some(vec_of(&[
                    "/usr/bin/g++", "-O2", "-std=c++17", "-o", "{binary}", "{source}",
                ])),
                run: vec_of(&["./{binary}"]),
                default_constraints: Constraints::new()
                    .with_time_ms(2000)
                    .with_memory_kb(256 * Constraints::MB)
                    .with_output_kb(64 * Constraints::MB)
                    .with_processes(1),
            },
        );

        languages.insert(
            "python3".to_string(),
            Language {
                name: "Python 3".into(),
                source_name: "main.py".into(),
                artifact_name: "main.py".into(),
                compile: None,
                run: vec_of(&["/usr/bin/python3", "{binary}"]),
                // Interpreted languages get looser time limits.
                default_constraints: Constraints::new()
                    .with_time_ms(10000)
                    .with_memory_kb(512 * Constraints::MB)
                    .with_output_kb(64 * Constraints::MB)
                    .with_processes(1),
            },
        );

        Self { languages }
    }

    pub fn get(&self, key: &str) -> Option<&Language> {
        self.languages.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.languages.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = LanguageRegistry::builtin();
        assert!(registry.get("cpp").is_some_and(Language::is_compiled));
        assert!(registry.get("python3").is_some_and(|l| !l.is_compiled()));
        assert!(registry.get("cobol").is_none());
    }

    #[test]
    fn test_expand_command() {
        let cmd = vec!["gcc".to_string(), "-o".to_string(), "{binary}".to_string(), "{source}".to_string()];
        let expanded = Language::expand_command(&cmd, "main.c", "program");
        assert_eq!(expanded, vec!["gcc", "-o", "program", "main.c"]);
    }
}
