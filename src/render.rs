//! Hands DOT source to the Graphviz layout engine and writes the image.

use crate::dot::DotWriter;
use crate::ir::GraphIR;
use chrono::{DateTime, Local, TimeZone};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Output directory does not exist: {0}")]
    MissingOutputDir(PathBuf),
    #[error("Layout engine `{0}` not found; is Graphviz installed?")]
    EngineUnavailable(String),
    #[error("Layout engine exited with {status}: {stderr}")]
    EngineFailed { status: ExitStatus, stderr: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

pub struct DiagramRenderer {
    output_dir: PathBuf,
    format: ImageFormat,
    engine: String,
    writer: DotWriter,
}

impl DiagramRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: ImageFormat::default(),
            engine: "dot".to_string(),
            writer: DotWriter::default(),
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Renders `ir` to `<output_dir>/<base_name>_<timestamp>.<ext>` and
    /// returns the written path.
    pub fn render(&self, ir: &GraphIR, base_name: &str) -> Result<PathBuf, RenderError> {
        if !self.output_dir.is_dir() {
            return Err(RenderError::MissingOutputDir(self.output_dir.clone()));
        }

        let path = output_path(&self.output_dir, base_name, self.format, &Local::now());
        let source = self.writer.write(ir);
        debug!(
            engine = %self.engine,
            path = %path.display(),
            nodes = ir.nodes.len(),
            edges = ir.edges.len(),
            "rendering diagram"
        );

        self.run_engine(&source, &path)?;
        info!(path = %path.display(), "diagram written");
        Ok(path)
    }

    fn run_engine(&self, source: &str, path: &Path) -> Result<(), RenderError> {
        let mut child = Command::new(&self.engine)
            .arg(format!("-T{}", self.format.extension()))
            .arg("-o")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RenderError::EngineUnavailable(self.engine.clone()),
                _ => RenderError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RenderError::EngineFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Timestamped output file; the suffix keeps earlier diagrams from being overwritten.
pub fn output_path<Tz: TimeZone>(
    dir: &Path,
    base_name: &str,
    format: ImageFormat,
    at: &DateTime<Tz>,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let file = format!(
        "{}_{}.{}",
        base_name,
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    );
    dir.join(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ConnectionFilter;
    use chrono::NaiveDate;

    #[test]
    fn test_output_path_timestamp() {
        let at = Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 3, 9)
                    .unwrap()
                    .and_hms_opt(7, 5, 2)
                    .unwrap(),
            )
            .unwrap();
        let path = output_path(Path::new("generated"), "output_diagram", ImageFormat::Png, &at);
        assert_eq!(path, Path::new("generated").join("output_diagram_20240309_070502.png"));
    }

    #[test]
    fn test_output_path_svg() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let path = output_path(Path::new("out"), "erd", ImageFormat::Svg, &at);
        assert_eq!(path, Path::new("out").join("erd_20251231_235959.svg"));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(ImageFormat::from_str("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_str("svg"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::from_str("gif"), None);
    }

    #[test]
    fn test_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ir = GraphIR::from_records(&[], ConnectionFilter::All);
        let renderer = DiagramRenderer::new(dir.path().join("generated"));

        let err = renderer.render(&ir, "output_diagram").unwrap_err();
        assert!(matches!(err, RenderError::MissingOutputDir(_)));
    }

    #[test]
    fn test_engine_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let ir = GraphIR::from_records(&[], ConnectionFilter::All);
        let renderer = DiagramRenderer::new(dir.path()).with_engine("schemadiag-no-such-engine");

        let err = renderer.render(&ir, "output_diagram").unwrap_err();
        assert!(matches!(
            err,
            RenderError::EngineUnavailable(name) if name == "schemadiag-no-such-engine"
        ));
    }
}
