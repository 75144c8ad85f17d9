use crate::card::{FlashCard, Subject, SubjectIcon};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const DEFAULT_COLOR: &str = "cyan";

/// Load a subject from a TSV file
/// Format: front<TAB>back
/// Lines starting with # are comments, or directives such as `# name: Spanish`,
/// `# description: ...`, `# color: yellow` and `# icon: languages`
/// Empty lines are skipped
pub fn load_subject(path: &Path) -> Result<Subject> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read subject file: {}", path.display()))?;

    let mut subject = Subject {
        name: id.clone(),
        id,
        description: String::new(),
        color: DEFAULT_COLOR.to_string(),
        icon: SubjectIcon::default(),
        cards: Vec::new(),
    };
    let mut fronts = HashSet::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if let Some((key, value)) = rest.split_once(':') {
                let value = value.trim();
                match key.trim().to_lowercase().as_str() {
                    "name" if !value.is_empty() => subject.name = value.to_string(),
                    "description" => subject.description = value.to_string(),
                    "color" | "colour" if !value.is_empty() => subject.color = value.to_string(),
                    "icon" => subject.icon = SubjectIcon::parse(value),
                    _ => {}
                }
            }
            continue;
        }

        let Some((front, back)) = line.split_once('\t') else {
            anyhow::bail!(
                "Invalid line {} in {}: expected front<TAB>back",
                line_num + 1,
                path.display()
            );
        };

        let front = front.trim();
        if front.is_empty() {
            anyhow::bail!("Empty front on line {} in {}", line_num + 1, path.display());
        }
        if !fronts.insert(front.to_string()) {
            anyhow::bail!(
                "Duplicate card '{}' on line {} in {}",
                front,
                line_num + 1,
                path.display()
            );
        }

        subject.cards.push(FlashCard::new(
            card_id(&subject.id, front),
            front,
            back.trim(),
        ));
    }

    Ok(subject)
}

/// Stable id of a file-authored card
pub fn card_id(subject_id: &str, front: &str) -> String {
    format!("{}/{}", subject_id, front)
}

/// List available subject files in a directory
pub fn list_subject_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read subjects directory: {}", dir.display()))?
    {
        let path = entry?.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "tsv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_subject() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(file, "# name: Spanish Vocabulary").unwrap();
        writeln!(file, "# description: Everyday words").unwrap();
        writeln!(file, "# color: yellow").unwrap();
        writeln!(file, "# icon: languages").unwrap();
        writeln!(file, "hola\thello").unwrap();
        writeln!(file, "# just a comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "gracias\tthank you").unwrap();

        let subject = load_subject(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_str().unwrap();

        assert_eq!(subject.id, stem);
        assert_eq!(subject.name, "Spanish Vocabulary");
        assert_eq!(subject.description, "Everyday words");
        assert_eq!(subject.color, "yellow");
        assert_eq!(subject.icon, SubjectIcon::Languages);
        assert_eq!(subject.cards.len(), 2);
        assert_eq!(subject.cards[1].front, "gracias");
        assert_eq!(subject.cards[1].back, "thank you");
        assert_eq!(subject.cards[0].id, format!("{}/hola", stem));
        assert!(subject.cards.iter().all(|c| c.is_new()));
    }

    #[test]
    fn test_defaults_without_directives() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(file, "2 + 2\t4").unwrap();

        let subject = load_subject(file.path()).unwrap();
        assert_eq!(subject.name, subject.id);
        assert_eq!(subject.color, DEFAULT_COLOR);
        assert_eq!(subject.icon, SubjectIcon::Book);
    }

    #[test]
    fn test_missing_tab_is_an_error() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(file, "hola\thello").unwrap();
        writeln!(file, "no tab here").unwrap();

        let err = load_subject(file.path()).unwrap_err().to_string();
        assert!(err.contains("line 2"), "{}", err);
    }

    #[test]
    fn test_duplicate_front_is_an_error() {
        let mut file = NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(file, "hola\thello").unwrap();
        writeln!(file, "hola\thi").unwrap();

        assert!(load_subject(file.path()).is_err());
    }

    #[test]
    fn test_list_subject_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.tsv"), "x\ty\n").unwrap();
        std::fs::write(dir.path().join("a.tsv"), "x\ty\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = list_subject_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.tsv", "b.tsv"]);

        assert!(list_subject_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
