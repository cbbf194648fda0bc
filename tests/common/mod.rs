//! Test helpers: build the gateway around fake conversion tools.
//!
//! The fakes are small shell scripts that mimic the file contract of the
//! real programs (where they read input, where they write output), which is
//! all the gateway relies on. The succeeding variants also answer version
//! probes so `/health` sees them as installed.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use conversion_gateway::{routes, AppState, Config};

/// soffice stand-in: copies the input to `<outdir>/<stem>.pdf`.
pub const SOFFICE_OK: &str = r#"#!/bin/sh
case "$1" in --version|-v) echo "fake 1.0"; exit 0 ;; esac
outdir=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    --convert-to) shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
sleep 0.3
name=$(basename "$input")
cp "$input" "$outdir/${name%.*}.pdf"
"#;

/// Records each version probe in `probes.log` beside the script.
pub const SOFFICE_COUNTING: &str = r#"#!/bin/sh
case "$1" in --version) echo probe >> "$(dirname "$0")/probes.log"; exit 0 ;; esac
exit 1
"#;

pub const SOFFICE_FAIL: &str = r#"#!/bin/sh
echo "Error: source file could not be loaded" >&2
exit 1
"#;

/// Exits cleanly without writing anything.
pub const SOFFICE_SILENT: &str = "#!/bin/sh\nexit 0\n";

pub const SOFFICE_HANG: &str = "#!/bin/sh\nsleep 10\n";

/// pdftoppm stand-in: writes 11 unpadded pages `<prefix>-1.jpg` ... `<prefix>-11.jpg`.
pub const PDFTOPPM_OK: &str = r#"#!/bin/sh
case "$1" in --version|-v) echo "fake 1.0"; exit 0 ;; esac
last=""
for arg in "$@"; do last="$arg"; done
i=1
while [ $i -le 11 ]; do
  printf 'page %s' "$i" > "$last-$i.jpg"
  i=$((i + 1))
done
"#;

pub const PDFTOPPM_FAIL: &str = r#"#!/bin/sh
echo "Syntax Error: Couldn't find trailer dictionary" >&2
exit 1
"#;

/// qpdf stand-in: copies input (second to last argument) to output (last).
pub const QPDF_OK: &str = r#"#!/bin/sh
case "$1" in --version|-v) echo "fake 1.0"; exit 0 ;; esac
prev=""
last=""
for arg in "$@"; do prev="$last"; last="$arg"; done
cp "$prev" "$last"
"#;

/// Succeeds with warnings, like qpdf's exit code 3.
pub const QPDF_WARN: &str = r#"#!/bin/sh
prev=""
last=""
for arg in "$@"; do prev="$last"; last="$arg"; done
cp "$prev" "$last"
echo "WARNING: file is damaged" >&2
exit 3
"#;

pub const QPDF_FAIL: &str = r#"#!/bin/sh
echo "qpdf: not a PDF file" >&2
exit 2
"#;

/// Scripts used for one test application
pub struct FakeTools {
    pub soffice: &'static str,
    pub pdftoppm: &'static str,
    pub qpdf: &'static str,
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            soffice: SOFFICE_OK,
            pdftoppm: PDFTOPPM_OK,
            qpdf: QPDF_OK,
            timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Test application: server plus the directories it works in.
pub struct TestApp {
    pub server: TestServer,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bin_dir: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_tools(FakeTools::default()).await
    }

    pub async fn with_tools(tools: FakeTools) -> Self {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir(&bin).unwrap();

        let mut config = Config::default();
        config.storage.staging_dir = tmp.path().join("uploads");
        config.storage.output_dir = tmp.path().join("converted");
        config.storage.max_upload_bytes = tools.max_upload_bytes;
        config.tools.soffice = write_script(&bin, "soffice", tools.soffice);
        config.tools.pdftoppm = write_script(&bin, "pdftoppm", tools.pdftoppm);
        config.tools.qpdf = write_script(&bin, "qpdf", tools.qpdf);
        config.tools.timeout_secs = tools.timeout_secs;

        let state = AppState::new(config).await.unwrap();
        let staging_dir = state.staging().dir().to_path_buf();
        let output_dir = state.artifacts().dir().to_path_buf();
        let server = TestServer::new(routes::router(state)).unwrap();

        Self {
            server,
            staging_dir,
            output_dir,
            bin_dir: bin,
            _tmp: tmp,
        }
    }

    pub fn staged_files(&self) -> Vec<String> {
        list_dir(&self.staging_dir)
    }

    pub fn output_files(&self) -> Vec<String> {
        list_dir(&self.output_dir)
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Multipart form with one `file` part.
pub fn single_file_form(file_name: &str, mime_type: &str, data: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_type(mime_type),
    )
}

/// Multipart form with repeated `files` parts, in the given order.
pub fn multi_file_form(files: &[(&str, Vec<u8>)]) -> MultipartForm {
    files.iter().fold(MultipartForm::new(), |form, (name, data)| {
        form.add_part(
            "files",
            Part::bytes(data.clone())
                .file_name(*name)
                .mime_type("application/pdf"),
        )
    })
}

/// PDF bytes whose page `n` shows `<label><n>`.
pub fn sample_pdf(label: &str, page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 1..=page_count {
        let content = format!("BT /F1 24 Tf 72 720 Td ({}{}) Tj ET", label, n);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Text drawn on each page, in page order.
pub fn page_texts(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}
