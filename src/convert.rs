//! External office-conversion fallback chain.
//!
//! Office documents that cannot be rewritten in place are first converted to
//! a page-based representation by an external tool. Converters are named
//! strategies behind one capability trait, tried sequentially in priority
//! order: first success wins, every failure is kept for diagnostics, and
//! exhausting the chain is the only hard failure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One converter's failure diagnostics.
#[derive(Debug, Clone)]
pub struct ConvertAttempt {
    pub converter: String,
    pub error: String,
}

/// Every converter in the chain failed.
#[derive(Debug)]
pub struct ExternalToolFailure {
    pub attempts: Vec<ConvertAttempt>,
}

impl fmt::Display for ExternalToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all converters failed")?;
        for attempt in &self.attempts {
            write!(f, "; {}: {}", attempt.converter, attempt.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExternalToolFailure {}

/// The convert capability: produce a PDF rendition of `input` in `out_dir`.
pub trait OfficeConverter {
    fn name(&self) -> &str;
    fn convert(&self, input: &Path, out_dir: &Path) -> std::result::Result<PathBuf, String>;
}

/// Subprocess-backed converter. `{input}` and `{outdir}` in the argument
/// template are substituted at call time.
pub struct CommandConverter {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl OfficeConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, input: &Path, out_dir: &Path) -> std::result::Result<PathBuf, String> {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &input.to_string_lossy())
                    .replace("{outdir}", &out_dir.to_string_lossy())
            })
            .collect();
        let output = Command::new(&self.program)
            .args(&rendered)
            .output()
            .map_err(|e| format!("failed to spawn {}: {e}", self.program))?;
        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let produced = out_dir
            .join(input.file_stem().unwrap_or_default())
            .with_extension("pdf");
        if !produced.exists() {
            return Err(format!("{} produced no output file", self.program));
        }
        Ok(produced)
    }
}

/// Ordered fallback chain over converters.
#[derive(Default)]
pub struct ConverterChain {
    converters: Vec<Box<dyn OfficeConverter>>,
}

impl ConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, converter: Box<dyn OfficeConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// The usual office-suite CLIs, most capable first.
    pub fn office_default() -> Self {
        let args: &[&str] = &[
            "--headless",
            "--convert-to",
            "pdf",
            "--outdir",
            "{outdir}",
            "{input}",
        ];
        Self::new()
            .push(Box::new(CommandConverter::new("soffice", "soffice", args)))
            .push(Box::new(CommandConverter::new(
                "libreoffice",
                "libreoffice",
                args,
            )))
            .push(Box::new(CommandConverter::new("lowriter", "lowriter", args)))
    }

    /// Try each converter in order; first success wins.
    pub fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> std::result::Result<PathBuf, ExternalToolFailure> {
        let mut attempts = Vec::new();
        for converter in &self.converters {
            match converter.convert(input, out_dir) {
                Ok(path) => {
                    log::debug!("convert: {} produced {}", converter.name(), path.display());
                    return Ok(path);
                }
                Err(error) => {
                    log::warn!("convert: {} failed: {error}", converter.name());
                    attempts.push(ConvertAttempt {
                        converter: converter.name().to_string(),
                        error,
                    });
                }
            }
        }
        Err(ExternalToolFailure { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedConverter {
        name: &'static str,
        result: std::result::Result<PathBuf, String>,
    }

    impl OfficeConverter for FixedConverter {
        fn name(&self) -> &str {
            self.name
        }

        fn convert(&self, _input: &Path, _out_dir: &Path) -> std::result::Result<PathBuf, String> {
            self.result.clone()
        }
    }

    #[test]
    fn first_success_wins() {
        let chain = ConverterChain::new()
            .push(Box::new(FixedConverter {
                name: "broken",
                result: Err("not installed".into()),
            }))
            .push(Box::new(FixedConverter {
                name: "works",
                result: Ok(PathBuf::from("/tmp/out.pdf")),
            }))
            .push(Box::new(FixedConverter {
                name: "never-reached",
                result: Err("should not run".into()),
            }));
        let out = chain.convert(Path::new("in.odt"), Path::new("/tmp")).unwrap();
        assert_eq!(out, PathBuf::from("/tmp/out.pdf"));
    }

    #[test]
    fn exhaustion_collects_every_failure() {
        let chain = ConverterChain::new()
            .push(Box::new(FixedConverter {
                name: "a",
                result: Err("missing binary".into()),
            }))
            .push(Box::new(FixedConverter {
                name: "b",
                result: Err("bad exit".into()),
            }));
        let err = chain
            .convert(Path::new("in.odt"), Path::new("/tmp"))
            .unwrap_err();
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[0].converter, "a");
        let message = err.to_string();
        assert!(message.contains("missing binary"));
        assert!(message.contains("bad exit"));
    }
}
